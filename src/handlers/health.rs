//! Health check handler

use axum::Json;
use serde::Serialize;

/// Public health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    /// Status indicator (always "ok")
    pub status: String,
}

/// Public health check for load balancers. Does not touch the database.
///
/// # Example
/// ```bash
/// curl http://localhost:3000/api/v1/health
/// # Returns: {"status":"ok"}
/// ```
pub async fn health_check() -> Json<HealthCheckResponse> {
    tracing::debug!("Health check requested");
    Json(HealthCheckResponse {
        status: "ok".to_string(),
    })
}
