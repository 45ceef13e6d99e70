//! Client Error Types
//!
//! Errors raised by the sync engine. The split mirrors how failures are
//! handled:
//!
//! - `StoreError` - the record store could not be reached, timed out, or
//!   answered with a rejection. [`StoreError::is_connectivity`] separates the
//!   two: connectivity failures degrade to local-only operation, rejections
//!   roll optimistic changes back.
//! - `CacheError` - the local cache could not be read or written.
//! - `SyncError` - what controller operations return.

use crate::shared::SharedError;
use std::time::Duration;
use thiserror::Error;

/// Record store failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No connection could be made (network down, DNS, refused)
    #[error("record store unreachable: {0}")]
    Unreachable(String),

    /// The call did not finish within the configured timeout
    #[error("record store call timed out after {0:?}")]
    Timeout(Duration),

    /// The store answered but refused the request
    #[error("record store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The addressed record does not exist in the store
    #[error("record not found in store: {0}")]
    NotFound(String),

    /// A record with this id already exists in the store
    #[error("record already exists in store: {0}")]
    Conflict(String),

    /// The store answered with something that could not be understood
    #[error("record store protocol error: {0}")]
    Protocol(String),
}

impl StoreError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// True for failures that say nothing about whether the write would succeed
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Timeout(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(Duration::ZERO)
        } else if err.is_connect() || err.is_request() {
            Self::Unreachable(err.to_string())
        } else if err.is_decode() {
            Self::Protocol(err.to_string())
        } else if let Some(status) = err.status() {
            Self::rejected(status.as_u16(), err.to_string())
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

/// Local cache failures
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored payload could not be decoded
    #[error("cache slot '{key}' is corrupt: {message}")]
    Corrupt { key: String, message: String },

    /// Stored payload was written by a newer schema
    #[error("cache slot '{key}' has unsupported schema version {version}")]
    UnsupportedVersion { key: String, version: u32 },

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned by sync controller operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Input was rejected before any network call
    #[error(transparent)]
    Validation(#[from] SharedError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl SyncError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(e) if e.is_validation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_classification() {
        assert!(StoreError::Unreachable("refused".into()).is_connectivity());
        assert!(StoreError::Timeout(Duration::from_secs(1)).is_connectivity());
        assert!(!StoreError::rejected(500, "boom").is_connectivity());
        assert!(!StoreError::NotFound("x".into()).is_connectivity());
        assert!(!StoreError::Conflict("x".into()).is_connectivity());
    }

    #[test]
    fn test_sync_error_validation() {
        let err: SyncError = SharedError::validation("trackingNumber", "blank").into();
        assert!(err.is_validation());

        let err: SyncError = StoreError::Unreachable("down".into()).into();
        assert!(!err.is_validation());
    }
}
