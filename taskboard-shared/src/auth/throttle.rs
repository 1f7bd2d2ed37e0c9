/// Login brute-force throttle
///
/// Each user carries a failure counter and the time of the last failed
/// attempt. Once the counter reaches [`MAX_FAILED_ATTEMPTS`], logins are
/// refused until [`BLOCK_WINDOW_MS`] has passed since that last failure.
///
/// # Call order
///
/// 1. [`LoginThrottle::check_and_advance`] before the password is verified
/// 2. [`LoginThrottle::record_failure`] or [`LoginThrottle::record_success`]
///    once the comparison result is known
///
/// The counter update and the password check are separate store round-trips
/// with no lock between them, so two concurrent failures can under-count.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::throttle::{ThrottleDecision, BLOCK_WINDOW_MS};
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let decision = ThrottleDecision::evaluate(5, Some(now - Duration::seconds(60)), now);
/// assert_eq!(decision, ThrottleDecision::Blocked { remaining_ms: BLOCK_WINDOW_MS - 60_000 });
/// ```

use crate::models::user::User;
use crate::store::{Store, StoreResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Failed attempts before the account is locked
pub const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Lockout window in milliseconds (5 minutes)
pub const BLOCK_WINDOW_MS: u64 = 300_000;

/// Outcome of a throttle check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Lockout is active
    Blocked { remaining_ms: u64 },

    /// Attempt may proceed
    Allowed,

    /// Lockout expired; the counter must be reset before proceeding
    Reset,
}

impl ThrottleDecision {
    /// Pure decision over a failure counter and its timestamp
    pub fn evaluate(
        failed_attempts: i32,
        last_failed_attempt: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        if failed_attempts < MAX_FAILED_ATTEMPTS {
            return ThrottleDecision::Allowed;
        }

        // A locked counter without a timestamp can't be timed; treat it as expired
        let Some(last) = last_failed_attempt else {
            return ThrottleDecision::Reset;
        };

        // Clock skew can put `last` in the future; clamp elapsed to zero
        let elapsed_ms = (now - last).num_milliseconds().max(0) as u64;

        if elapsed_ms < BLOCK_WINDOW_MS {
            ThrottleDecision::Blocked {
                remaining_ms: BLOCK_WINDOW_MS - elapsed_ms,
            }
        } else {
            ThrottleDecision::Reset
        }
    }

    pub fn for_user(user: &User, now: DateTime<Utc>) -> Self {
        Self::evaluate(user.failed_attempts, user.last_failed_attempt, now)
    }
}

/// Result of [`LoginThrottle::check_and_advance`] as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleCheck {
    Blocked { remaining_ms: u64 },
    Allowed,
}

/// Store-backed throttle guard
#[derive(Clone)]
pub struct LoginThrottle {
    store: Arc<dyn Store>,
}

impl LoginThrottle {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Decides whether `user` may attempt a login at `now`
    ///
    /// An expired lockout resets the stored counter and is reported as
    /// `Allowed` in the same call. `user` is reset in place before the write.
    ///
    /// # Errors
    ///
    /// Propagates the store error if persisting the reset fails; `user`
    /// still holds the reset counter.
    pub async fn check_and_advance(
        &self,
        user: &mut User,
        now: DateTime<Utc>,
    ) -> StoreResult<ThrottleCheck> {
        match ThrottleDecision::for_user(user, now) {
            ThrottleDecision::Blocked { remaining_ms } => {
                warn!(
                    user_id = %user.id,
                    failed_attempts = user.failed_attempts,
                    remaining_ms,
                    "Login attempt on locked account"
                );
                Ok(ThrottleCheck::Blocked { remaining_ms })
            }
            ThrottleDecision::Reset => {
                info!(user_id = %user.id, "Lockout window expired, resetting failure counter");
                // The in-memory counter restarts even if the write below fails,
                // so the next failure is counted from one.
                user.failed_attempts = 0;
                user.last_failed_attempt = Some(now);
                self.store
                    .update_login_state(user.id, 0, Some(now))
                    .await?;
                Ok(ThrottleCheck::Allowed)
            }
            ThrottleDecision::Allowed => Ok(ThrottleCheck::Allowed),
        }
    }

    /// Increments the failure counter and stamps `now`
    pub async fn record_failure(&self, user: &mut User, now: DateTime<Utc>) -> StoreResult<()> {
        let failed_attempts = user.failed_attempts.saturating_add(1);

        self.store
            .update_login_state(user.id, failed_attempts, Some(now))
            .await?;

        user.failed_attempts = failed_attempts;
        user.last_failed_attempt = Some(now);

        debug!(user_id = %user.id, failed_attempts, "Recorded failed login");
        Ok(())
    }

    /// Clears the failure counter after a successful login
    ///
    /// No store call is made when the counter is already zero.
    pub async fn record_success(&self, user: &mut User, now: DateTime<Utc>) -> StoreResult<()> {
        if user.failed_attempts == 0 {
            return Ok(());
        }

        self.store
            .update_login_state(user.id, 0, Some(now))
            .await?;

        user.failed_attempts = 0;
        user.last_failed_attempt = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::CreateUser;
    use crate::store::memory::{FailPoint, MemoryStore};
    use chrono::Duration;

    async fn seeded() -> (Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .insert_user(CreateUser {
                email: "a@b.com".to_string(),
                username: "abc".to_string(),
                password_hash: "hash".to_string(),
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                recovery_answer_hash: "answer".to_string(),
            })
            .await
            .unwrap();
        (store, user)
    }

    #[test]
    fn test_below_threshold_is_allowed() {
        let now = Utc::now();
        for attempts in 0..MAX_FAILED_ATTEMPTS {
            assert_eq!(
                ThrottleDecision::evaluate(attempts, Some(now), now),
                ThrottleDecision::Allowed
            );
        }
    }

    #[test]
    fn test_blocked_inside_window() {
        let now = Utc::now();

        assert_eq!(
            ThrottleDecision::evaluate(5, Some(now), now),
            ThrottleDecision::Blocked { remaining_ms: BLOCK_WINDOW_MS }
        );
        assert_eq!(
            ThrottleDecision::evaluate(7, Some(now - Duration::milliseconds(299_999)), now),
            ThrottleDecision::Blocked { remaining_ms: 1 }
        );
    }

    #[test]
    fn test_window_boundary_resets() {
        let now = Utc::now();

        assert_eq!(
            ThrottleDecision::evaluate(5, Some(now - Duration::milliseconds(300_000)), now),
            ThrottleDecision::Reset
        );
        assert_eq!(ThrottleDecision::evaluate(5, None, now), ThrottleDecision::Reset);
    }

    #[test]
    fn test_future_timestamp_blocks_full_window() {
        let now = Utc::now();
        assert_eq!(
            ThrottleDecision::evaluate(5, Some(now + Duration::seconds(10)), now),
            ThrottleDecision::Blocked { remaining_ms: BLOCK_WINDOW_MS }
        );
    }

    #[tokio::test]
    async fn test_failures_accumulate_and_persist() {
        let (store, mut user) = seeded().await;
        let throttle = LoginThrottle::new(store.clone());
        let now = Utc::now();

        for _ in 0..3 {
            throttle.record_failure(&mut user, now).await.unwrap();
        }

        let stored = store.user_by_username("abc").unwrap();
        assert_eq!(stored.failed_attempts, 3);
        assert_eq!(stored.last_failed_attempt, Some(now));
        assert_eq!(user.failed_attempts, 3);
    }

    #[tokio::test]
    async fn test_expired_lockout_resets_and_allows() {
        let (store, mut user) = seeded().await;
        let throttle = LoginThrottle::new(store.clone());
        let start = Utc::now();

        for _ in 0..MAX_FAILED_ATTEMPTS {
            throttle.record_failure(&mut user, start).await.unwrap();
        }
        assert!(matches!(
            throttle.check_and_advance(&mut user, start).await.unwrap(),
            ThrottleCheck::Blocked { .. }
        ));

        let later = start + Duration::minutes(5);
        assert_eq!(
            throttle.check_and_advance(&mut user, later).await.unwrap(),
            ThrottleCheck::Allowed
        );
        assert_eq!(store.user_by_username("abc").unwrap().failed_attempts, 0);
    }

    #[tokio::test]
    async fn test_failed_reset_still_restarts_counter() {
        let (store, mut user) = seeded().await;
        let throttle = LoginThrottle::new(store.clone());
        let start = Utc::now();

        for _ in 0..MAX_FAILED_ATTEMPTS {
            throttle.record_failure(&mut user, start).await.unwrap();
        }

        store.fail_on(FailPoint::ResetLoginState);
        let later = start + Duration::minutes(6);
        assert!(throttle.check_and_advance(&mut user, later).await.is_err());
        assert_eq!(user.failed_attempts, 0);

        throttle.record_failure(&mut user, later).await.unwrap();
        assert_eq!(store.user_by_username("abc").unwrap().failed_attempts, 1);
    }

    #[tokio::test]
    async fn test_success_without_failures_skips_store() {
        let (store, mut user) = seeded().await;
        let throttle = LoginThrottle::new(store.clone());

        store.fail_on(FailPoint::UpdateLoginState);
        assert!(throttle.record_success(&mut user, Utc::now()).await.is_ok());

        user.failed_attempts = 2;
        assert!(throttle.record_success(&mut user, Utc::now()).await.is_err());
        assert_eq!(user.failed_attempts, 2);
    }
}
