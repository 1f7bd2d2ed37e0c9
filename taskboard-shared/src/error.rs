/// Domain error taxonomy shared by the auth and task services
///
/// Each variant maps onto one HTTP status class in the API crate:
///
/// | Variant              | Meaning                                    |
/// |----------------------|--------------------------------------------|
/// | `Validation`         | malformed or missing input                 |
/// | `Conflict`           | duplicate email or username                |
/// | `NotFound`           | referenced user/task/assignment is absent  |
/// | `InvalidCredentials` | bad password or recovery answer            |
/// | `Throttled`          | login lockout is active                    |
/// | `Store`, `Password`  | infrastructure failure                     |

use crate::auth::password::PasswordError;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};

/// A single violated input rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field that failed validation
    pub field: String,

    /// Human-readable message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Service error type
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Deliberately carries no detail: unknown account and wrong secret are
    /// indistinguishable
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked for another {remaining_ms} ms")]
    Throttled { remaining_ms: u64 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl ServiceError {
    /// Shorthand for a single-field validation error
    pub fn invalid(field: &str, message: &str) -> Self {
        ServiceError::Validation(vec![FieldError::new(field, message)])
    }
}

/// Service result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;
