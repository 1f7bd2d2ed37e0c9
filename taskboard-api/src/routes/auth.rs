/// Account endpoints
///
/// # Endpoints
///
/// - `POST /api/register` - Create an account
/// - `POST /api/login` - Log in with email or username
/// - `POST /api/recovery` - Reset the password with the recovery answer
///
/// Successful responses carry the public user fields only:
///
/// ```json
/// {
///   "success": true,
///   "message": "Login successful",
///   "user": { "id": "uuid", "email": "a@b.com", "username": "abc", "firstName": "A", "lastName": "B" }
/// }
/// ```

use super::{ApiJson, Envelope};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use taskboard_shared::auth::service::{Credentials, Recovery, Registration};
use taskboard_shared::error::ServiceError;
use taskboard_shared::models::user::PublicUser;

/// Shown for unknown accounts and wrong passwords alike
const LOGIN_FAILED: &str = "Incorrect username/email or password";

#[derive(Debug, Serialize)]
pub struct UserPayload {
    pub user: PublicUser,
}

/// Register a new user
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or username/email already taken
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Registration>,
) -> ApiResult<(StatusCode, Json<Envelope<UserPayload>>)> {
    let user = state.auth.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::ok("User registered successfully", UserPayload { user })),
    ))
}

/// Log in
///
/// The `email` field accepts either an email address or a username.
///
/// # Errors
///
/// - `400 Bad Request`: Missing email/username or password
/// - `401 Unauthorized`: Wrong credentials, or the account is locked
///   (the body then includes `remainingTime` in milliseconds)
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Credentials>,
) -> ApiResult<Json<Envelope<UserPayload>>> {
    let user = state.auth.login(req).await.map_err(|err| match err {
        ServiceError::InvalidCredentials => ApiError::Unauthorized(LOGIN_FAILED.to_string()),
        other => other.into(),
    })?;

    Ok(Json(Envelope::ok("Login successful", UserPayload { user })))
}

/// Reset a forgotten password
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Unknown email or wrong recovery answer
/// - `500 Internal Server Error`: Server error
pub async fn recovery(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Recovery>,
) -> ApiResult<Json<Envelope<UserPayload>>> {
    let user = state.auth.recover(req).await?;

    Ok(Json(Envelope::ok(
        "Password recovered successfully",
        UserPayload { user },
    )))
}
