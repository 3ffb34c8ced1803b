pub mod appointments;
pub mod auth;
pub mod doctors;
pub mod health;
pub mod patients;
pub mod users;

use crate::{
    error::{Error, Result},
    state::AppState,
};

/// Helper to log handler errors with appropriate level
pub(crate) fn log_handler_error(operation: &str, e: &Error) {
    if e.is_client_error() {
        tracing::warn!(operation = operation, error = %e, "Handler operation failed");
    } else {
        tracing::error!(operation = operation, error = %e, "Handler operation failed");
    }
}

/// Helper to acquire database connection with consistent error logging
pub(crate) async fn acquire_db_connection(
    state: &AppState,
    operation: &'static str,
) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>> {
    state.pool.acquire().await.map_err(|e| {
        tracing::error!(
            operation = operation,
            error_code = "DATABASE_ACQUISITION_FAILED",
            error = %e,
            "Failed to acquire database connection",
        );
        Error::Internal(format!("Failed to acquire database connection: {}", e))
    })
}
