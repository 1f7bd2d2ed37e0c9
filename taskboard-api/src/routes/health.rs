/// Health check endpoint
///
/// Reports that the server is up and whether the store answers a ping.
///
/// # Endpoint
///
/// ```text
/// GET /api/health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "success": true,
///   "message": "Taskboard API is running",
///   "timestamp": "2025-01-01T00:00:00Z",
///   "database": "connected"
/// }
/// ```

use crate::app::AppState;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,

    pub message: String,

    pub timestamp: DateTime<Utc>,

    /// `connected` or `disconnected`
    pub database: String,
}

/// Health check handler
///
/// Always answers 200; a failed ping only changes `database`.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.store.ping().await {
        Ok(()) => "connected",
        Err(err) => {
            tracing::warn!(error = %err, "Store ping failed");
            "disconnected"
        }
    };

    Json(HealthResponse {
        success: true,
        message: "Taskboard API is running".to_string(),
        timestamp: Utc::now(),
        database: database.to_string(),
    })
}
