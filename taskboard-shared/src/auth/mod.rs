/// Account management
///
/// # Modules
///
/// - [`password`]: Argon2id hashing behind the [`password::CredentialHasher`] trait
/// - [`throttle`]: failed-login counter and lockout window
/// - [`service`]: registration, login and recovery orchestration
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskboard_shared::auth::{password::{Argon2Hasher, HashParams}, service::AuthService};
/// use taskboard_shared::store::memory::MemoryStore;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = Argon2Hasher::new(HashParams::default())?;
/// let auth = AuthService::new(Arc::new(MemoryStore::new()), Arc::new(hasher));
/// # Ok(())
/// # }
/// ```

pub mod password;
pub mod service;
pub mod throttle;
