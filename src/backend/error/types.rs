/**
 * Backend Error Types
 *
 * Errors raised by the record store handlers. Every variant maps to an HTTP
 * status code so handlers can return `BackendError` directly.
 *
 * # Error Categories
 *
 * ## Handler Errors
 *
 * Request-level problems with an explicit status code.
 *
 * ## Record Errors
 *
 * - `NotFound` - the addressed record does not exist (404)
 * - `Conflict` - a record with the given id already exists (409)
 *
 * ## Storage Errors
 *
 * - `DatabaseError` - sqlx failures (500)
 * - `StateError` - a stored row could not be turned back into a record (500)
 */

use thiserror::Error;
use axum::http::StatusCode;
use crate::shared::SharedError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use logitrack::backend::error::BackendError;
///
/// let err = BackendError::not_found("3f1c");
/// assert_eq!(err.status_code().as_u16(), 404);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error with an explicit status code
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// The addressed record does not exist
    #[error("Record not found: {id}")]
    NotFound {
        /// Record id from the request path
        id: String,
    },

    /// A record with this id already exists
    #[error("Record already exists: {id}")]
    Conflict {
        /// Record id from the request body
        id: String,
    },

    /// Stored data could not be decoded
    #[error("State error: {message}")]
    StateError {
        /// Human-readable error message
        message: String,
    },

    /// Database failure
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Shared error (validation, serialization)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn conflict(id: impl Into<String>) -> Self {
        Self::Conflict { id: id.into() }
    }

    /// Create a new state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::StateError {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `HandlerError` - Uses the status code from the error
    /// - `NotFound` - 404 Not Found
    /// - `Conflict` - 409 Conflict
    /// - `StateError`, `DatabaseError`, `SerializationError` - 500 Internal Server Error
    /// - `SharedError` - 400 for validation and snapshot errors, 500 otherwise
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::StateError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                SharedError::SnapshotError { .. } => StatusCode::BAD_REQUEST,
            },
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    ///
    /// Database details are logged, not returned to the caller.
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::NotFound { id } => format!("no record with id '{}'", id),
            Self::Conflict { id } => format!("a record with id '{}' already exists", id),
            Self::StateError { message } => message.clone(),
            Self::DatabaseError(_) => "database error".to_string(),
            Self::SharedError(err) => err.to_string(),
            Self::SerializationError(err) => err.to_string(),
        }
    }
}
