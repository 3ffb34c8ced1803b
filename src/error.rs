use thiserror::Error;
use std::collections::HashMap;
use std::fmt;
use serde::{Serialize, Deserialize};

// Import Axum types for HTTP response conversion
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Structured validation errors with field-level error mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationErrors {
    Single { field: String, message: String },
    Multiple { fields: HashMap<String, String> },
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationErrors::Single { field, message } => write!(f, "{}: {}", field, message),
            ValidationErrors::Multiple { fields } => {
                let mut entries: Vec<_> = fields.iter().collect();
                entries.sort();
                let joined = entries
                    .into_iter()
                    .map(|(field, message)| format!("{}: {}", field, message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}", joined)
            }
        }
    }
}

/// The custom error type for the application.
#[derive(Debug, Error)]
pub enum Error {
    /// An error originating from the sqlx library.
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A validation error with field-level details.
    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    /// A not found error (resource does not exist).
    #[error("Not found: {0}")]
    NotFound(String),

    /// A forbidden error (caller lacks permission).
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// A conflict error (duplicate value, taken slot, dependent rows).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An authentication error (missing/invalid token or credentials).
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// An internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    /// Shorthand for a validation error on a single field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation(ValidationErrors::Single {
            field: field.into(),
            message: message.into(),
        })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the error was caused by the client rather than the server.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// A type alias for `Result<T, Error>` to simplify function signatures.
pub type Result<T> = std::result::Result<T, Error>;

/// Convert custom Error to HTTP response
///
/// Each variant maps to a status code and a JSON body with an error message
/// and a machine-readable code. Database and configuration details are not
/// exposed to clients.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            Error::Validation(errors) => {
                let fields = match errors {
                    ValidationErrors::Single { field, message } => {
                        HashMap::from([(field, message)])
                    }
                    ValidationErrors::Multiple { fields } => fields,
                };
                serde_json::json!({
                    "error": "Validation failed",
                    "code": "VALIDATION_ERROR",
                    "fields": fields
                })
            }
            Error::NotFound(msg) => {
                serde_json::json!({
                    "error": msg,
                    "code": "NOT_FOUND"
                })
            }
            Error::Forbidden(msg) => {
                serde_json::json!({
                    "error": msg,
                    "code": "FORBIDDEN"
                })
            }
            Error::Conflict(msg) => {
                serde_json::json!({
                    "error": msg,
                    "code": "CONFLICT"
                })
            }
            Error::Authentication(msg) => {
                serde_json::json!({
                    "error": msg,
                    "code": "AUTHENTICATION_FAILED"
                })
            }
            Error::Sqlx(_) => {
                serde_json::json!({
                    "error": "Database error",
                    "code": "INTERNAL_ERROR"
                })
            }
            Error::Internal(msg) => {
                serde_json::json!({
                    "error": msg,
                    "code": "INTERNAL_ERROR"
                })
            }
            Error::Config(_) => {
                serde_json::json!({
                    "error": "Configuration error",
                    "code": "CONFIG_ERROR"
                })
            }
        };

        (status, Json(body)).into_response()
    }
}
