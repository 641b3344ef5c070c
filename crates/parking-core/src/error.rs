//! Unified error handling for the parking backend
//!
//! Every failure in the lifecycle engine surfaces as an [`AppError`]. The
//! domain variants follow a fixed taxonomy (see [`ErrorKind`]) so the HTTP
//! boundary can map them to a status without inspecting messages.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Domain Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    State(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Calculation error: {0}")]
    Calculation(String),

    // ==================== Boundary Errors ====================
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification of an [`AppError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing input
    Validation,
    /// Referenced entity does not exist
    NotFound,
    /// Uniqueness or exclusivity would be violated
    Conflict,
    /// Entity exists but is in the wrong lifecycle state
    State,
    /// No capacity left for the request
    ResourceExhausted,
    /// A fare could not be computed
    Calculation,
    /// Caller identity missing or rejected
    Unauthorized,
    /// Storage or runtime failure
    Infrastructure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::State => write!(f, "state"),
            ErrorKind::ResourceExhausted => write!(f, "resource_exhausted"),
            ErrorKind::Calculation => write!(f, "calculation"),
            ErrorKind::Unauthorized => write!(f, "unauthorized"),
            ErrorKind::Infrastructure => write!(f, "infrastructure"),
        }
    }
}

impl AppError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::State(_) => ErrorKind::State,
            AppError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            AppError::Calculation(_) => ErrorKind::Calculation,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Transaction(_)
            | AppError::Internal(_)
            | AppError::Config(_)
            | AppError::Serialization(_) => ErrorKind::Infrastructure,
        }
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_) => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::Conflict(_) | AppError::State(_) => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            AppError::Calculation(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // 503 Service Unavailable
            AppError::ResourceExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::State(_) => "invalid_state",
            AppError::ResourceExhausted(_) => "resource_exhausted",
            AppError::Calculation(_) => "calculation_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Postgres SQLSTATE for `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres SQLSTATE for `foreign_key_violation`
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Postgres SQLSTATE for `check_violation`
const CHECK_VIOLATION: &str = "23514";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return AppError::Conflict(format!("Unique constraint {} violated", constraint))
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return AppError::NotFound(format!("Referenced row missing ({})", constraint))
                }
                Some(CHECK_VIOLATION) => {
                    return AppError::Validation(format!("Check constraint {} violated", constraint))
                }
                _ => {}
            }
        }

        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => AppError::Pool(err.to_string()),
            other => AppError::Database(other.to_string()),
        }
    }
}
