/// Registration, login and password recovery
///
/// [`AuthService`] is constructed with an explicit store and hasher; every
/// operation validates its input first and short-circuits on the first
/// failing stage.
///
/// Login and recovery return the same generic [`ServiceError::InvalidCredentials`]
/// whether the account is missing or the secret is wrong.

use super::password::CredentialHasher;
use super::throttle::{LoginThrottle, ThrottleCheck};
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{CreateUser, PublicUser, User};
use crate::store::{Store, StoreError};
use crate::validation::{check, validate_email, validate_password, validate_username, WireNames};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use validator::Validate;

/// New account details
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct Registration {
    #[validate(custom(function = "validate_email"))]
    pub email: String,

    #[validate(custom(function = "validate_username"))]
    pub username: String,

    #[validate(custom(function = "validate_password"))]
    pub password: String,

    #[serde(rename = "firstName")]
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,

    #[serde(rename = "lastName")]
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,

    #[serde(rename = "recoveryAnswer")]
    #[validate(length(min = 1, message = "Recovery answer is required"))]
    pub recovery_answer: String,
}

impl WireNames for Registration {
    const WIRE_NAMES: &'static [(&'static str, &'static str)] = &[
        ("first_name", "firstName"),
        ("last_name", "lastName"),
        ("recovery_answer", "recoveryAnswer"),
    ];
}

/// Login attempt
///
/// `identifier` is an email when it contains `@`, otherwise a username.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct Credentials {
    #[serde(rename = "email")]
    #[validate(length(min = 1, message = "Email or username is required"))]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl WireNames for Credentials {
    const WIRE_NAMES: &'static [(&'static str, &'static str)] = &[("identifier", "email")];
}

/// Password reset through the security question
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(default)]
pub struct Recovery {
    #[validate(custom(function = "validate_email"))]
    pub email: String,

    #[serde(rename = "recoveryAnswer")]
    #[validate(length(min = 1, message = "Recovery answer is required"))]
    pub recovery_answer: String,

    /// New password
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

impl WireNames for Recovery {
    const WIRE_NAMES: &'static [(&'static str, &'static str)] =
        &[("recovery_answer", "recoveryAnswer")];
}

/// Auth service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    hasher: Arc<dyn CredentialHasher>,
    throttle: LoginThrottle,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, hasher: Arc<dyn CredentialHasher>) -> Self {
        let throttle = LoginThrottle::new(store.clone());
        Self {
            store,
            hasher,
            throttle,
        }
    }

    /// Creates an account
    ///
    /// # Errors
    ///
    /// - `Validation` listing every violated rule
    /// - `Conflict` if the username or email is taken
    /// - `Store` / `Password` on infrastructure failure
    pub async fn register(&self, input: Registration) -> ServiceResult<PublicUser> {
        check(&input)?;

        if self.store.find_user_by_username(&input.username).await?.is_some() {
            return Err(ServiceError::Conflict("Username is already taken".to_string()));
        }
        if self.store.find_user_by_email(&input.email).await?.is_some() {
            return Err(ServiceError::Conflict("Email is already registered".to_string()));
        }

        // Independent salts: equal inputs never produce equal hashes
        let password_hash = self.hasher.hash(&input.password)?;
        let recovery_answer_hash = self.hasher.hash(&input.recovery_answer)?;

        let user = self
            .store
            .insert_user(CreateUser {
                email: input.email,
                username: input.username,
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
                recovery_answer_hash,
            })
            .await
            .map_err(|err| match err {
                // Lost a race with a concurrent registration
                StoreError::UniqueViolation(constraint) if constraint.contains("username") => {
                    ServiceError::Conflict("Username is already taken".to_string())
                }
                StoreError::UniqueViolation(_) => {
                    ServiceError::Conflict("Email is already registered".to_string())
                }
                other => other.into(),
            })?;

        info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(PublicUser::from(&user))
    }

    pub async fn login(&self, credentials: Credentials) -> ServiceResult<PublicUser> {
        self.login_at(credentials, Utc::now()).await
    }

    /// Authenticates at a given instant
    ///
    /// # Errors
    ///
    /// - `Validation` if either field is empty
    /// - `Throttled` while the account is locked
    /// - `InvalidCredentials` for an unknown account or wrong password
    /// - `Store` if the failure counter can't be persisted
    pub async fn login_at(
        &self,
        credentials: Credentials,
        now: DateTime<Utc>,
    ) -> ServiceResult<PublicUser> {
        check(&credentials)?;

        let mut user = match self.lookup(&credentials.identifier).await? {
            Some(user) => user,
            None => {
                warn!("Login attempt for unknown account");
                return Err(ServiceError::InvalidCredentials);
            }
        };

        match self.throttle.check_and_advance(&mut user, now).await {
            Ok(ThrottleCheck::Blocked { remaining_ms }) => {
                return Err(ServiceError::Throttled { remaining_ms });
            }
            Ok(ThrottleCheck::Allowed) => {}
            Err(err) => {
                // The attempt still proceeds; the counter is rewritten below
                warn!(user_id = %user.id, error = %err, "Failed to reset expired lockout");
            }
        }

        if !self.hasher.verify(&credentials.password, &user.password_hash)? {
            self.throttle.record_failure(&mut user, now).await.map_err(|err| {
                error!(user_id = %user.id, error = %err, "Failed to record login failure");
                err
            })?;
            warn!(
                user_id = %user.id,
                failed_attempts = user.failed_attempts,
                "Login failed: wrong password"
            );
            return Err(ServiceError::InvalidCredentials);
        }

        if let Err(err) = self.throttle.record_success(&mut user, now).await {
            warn!(user_id = %user.id, error = %err, "Failed to clear login failures");
        }

        info!(user_id = %user.id, "User logged in");

        Ok(PublicUser::from(&user))
    }

    /// Replaces the password after checking the recovery answer
    pub async fn recover(&self, input: Recovery) -> ServiceResult<PublicUser> {
        check(&input)?;

        let Some(user) = self.store.find_user_by_email(&input.email).await? else {
            warn!("Recovery attempt for unknown account");
            return Err(ServiceError::InvalidCredentials);
        };

        if !self
            .hasher
            .verify(&input.recovery_answer, &user.recovery_answer_hash)?
        {
            warn!(user_id = %user.id, "Recovery failed: wrong answer");
            return Err(ServiceError::InvalidCredentials);
        }

        let password_hash = self.hasher.hash(&input.password)?;

        let updated = self
            .store
            .update_password(user.id, &password_hash)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        info!(user_id = %updated.id, "Password recovered");

        Ok(PublicUser::from(&updated))
    }

    async fn lookup(&self, identifier: &str) -> ServiceResult<Option<User>> {
        let user = if identifier.contains('@') {
            self.store.find_user_by_email(identifier).await?
        } else {
            self.store.find_user_by_username(identifier).await?
        };
        Ok(user)
    }
}
