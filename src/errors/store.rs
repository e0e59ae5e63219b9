//! Persistence error types
//!
//! Raised by [`crate::store::RemoteStore`] and [`crate::store::SnapshotStore`]
//! implementations. A command whose persistence call fails with one of these
//! is never committed to the undo history.
//!
//! # Examples
//!
//! ```rust
//! use scriptgraph::errors::StoreError;
//!
//! let err = StoreError::NotFound("q1".to_string());
//! assert!(err.is_not_found());
//! assert_eq!(err.error_code(), "NOT_FOUND");
//! ```

use thiserror::Error;

/// Remote store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Node not found by id
    #[error("Node '{0}' not found")]
    NotFound(String),

    /// Node id already taken
    #[error("Node '{0}' already exists")]
    AlreadyExists(String),

    /// Snapshot not found by id
    #[error("Snapshot '{0}' not found")]
    SnapshotNotFound(String),

    /// Store answered with a non-success status
    #[error("Remote store rejected request ({status}): {message}")]
    Rejected {
        /// HTTP-style status code
        status: u16,
        /// Body or reason returned by the store
        message: String,
    },

    /// Store could not be reached
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// Base URL could not be used to build a request
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    /// Request was cancelled before it resolved
    #[error("Request cancelled")]
    Cancelled,

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP transport error
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Database operation failed
    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl StoreError {
    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound(_) | StoreError::SnapshotNotFound(_)
        ) || matches!(self, StoreError::Rejected { status: 404, .. })
    }

    /// Check if retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Rejected { status, .. } => *status >= 500,
            #[cfg(feature = "http")]
            StoreError::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) | StoreError::SnapshotNotFound(_) => "NOT_FOUND",
            StoreError::AlreadyExists(_) => "CONFLICT",
            StoreError::Rejected { .. } => "REJECTED",
            StoreError::Unavailable(_) => "UNAVAILABLE",
            StoreError::InvalidUrl(_) => "INVALID_URL",
            StoreError::Cancelled => "CANCELLED",
            StoreError::Serialization(_) => "SERIALIZATION_ERROR",
            #[cfg(feature = "http")]
            StoreError::Http(_) => "HTTP_ERROR",
            #[cfg(feature = "sqlite")]
            StoreError::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = StoreError::NotFound("q1".to_string());
        assert_eq!(err.to_string(), "Node 'q1' not found");
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_rejected_status_classification() {
        let server = StoreError::Rejected {
            status: 503,
            message: "busy".to_string(),
        };
        assert!(server.is_retryable());
        assert_eq!(server.error_code(), "REJECTED");

        let missing = StoreError::Rejected {
            status: 404,
            message: "gone".to_string(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_retryable());
    }

    #[test]
    fn test_unavailable_is_retryable() {
        let err = StoreError::Unavailable("connection reset".to_string());
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "UNAVAILABLE");
    }
}
