/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login and password recovery
/// - `tasks`: Task creation, updates and listings

pub mod auth;
pub mod health;
pub mod tasks;

use crate::error::ApiError;
use axum::{extract::rejection::JsonRejection, extract::FromRequest, http::Uri};
use serde::Serialize;

/// `Json` extractor whose rejections use the API error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

/// Success envelope: `{ "success": true, "message": ..., ...payload }`
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,

    pub message: String,

    #[serde(flatten)]
    pub payload: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: impl Into<String>, payload: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            payload,
        }
    }
}

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> ApiError {
    tracing::debug!(%uri, "Route not found");
    ApiError::NotFound("Route not found".to_string())
}
