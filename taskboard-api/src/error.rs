/// Error handling for the API server
///
/// Handlers return `Result<T, ApiError>`; the error renders the shared
/// response envelope with the matching status code:
///
/// ```json
/// { "success": false, "message": "...", "errors": [...], "remainingTime": 120000 }
/// ```
///
/// `errors` is present only for validation failures and `remainingTime`
/// (milliseconds) only for locked accounts.
///
/// # Example
///
/// ```
/// use taskboard_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::Value;
///
/// async fn handler() -> ApiResult<Json<Value>> {
///     Err(ApiError::NotFound("Task not found".to_string()))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskboard_shared::error::{FieldError, ServiceError};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400), including duplicate accounts
    BadRequest(String),

    /// Bad request (400) with per-field details
    ValidationError(Vec<FieldError>),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Unauthorized (401) while the account is locked
    AccountLocked { remaining_ms: u64 },

    /// Not found (404)
    NotFound(String),

    /// Internal server error (500)
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,

    /// Lockout time left in milliseconds
    #[serde(rename = "remainingTime", skip_serializing_if = "Option::is_none")]
    pub remaining_time: Option<u64>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::AccountLocked { remaining_ms } => {
                write!(f, "Account locked: {} ms remaining", remaining_ms)
            }
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Lockout message with the remaining time rounded up to whole seconds
fn lockout_message(remaining_ms: u64) -> String {
    format!(
        "Account locked due to multiple failed attempts. Try again in {} seconds.",
        remaining_ms.div_ceil(1000)
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, errors, remaining_time) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None, None),
            ApiError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(errors),
                None,
            ),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None, None),
            ApiError::AccountLocked { remaining_ms } => (
                StatusCode::UNAUTHORIZED,
                lockout_message(remaining_ms),
                None,
                Some(remaining_ms),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None, None),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            errors,
            remaining_time,
        });

        (status, body).into_response()
    }
}

/// Convert domain errors to API errors
impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(errors) => ApiError::ValidationError(errors),
            ServiceError::Conflict(msg) => ApiError::BadRequest(msg),
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            ServiceError::Throttled { remaining_ms } => ApiError::AccountLocked { remaining_ms },
            ServiceError::Store(err) => ApiError::InternalError(format!("Store error: {}", err)),
            ServiceError::Password(err) => {
                ApiError::InternalError(format!("Password operation failed: {}", err))
            }
        }
    }
}
