//! Lock coordination error types
//!
//! A node held by another editor is not an error: it is reported as a
//! read-only outcome. These errors cover the coordinator and presence channel
//! themselves going away.

use thiserror::Error;

/// Lock coordinator and presence channel errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Coordinator task is no longer running
    #[error("Lock coordinator unavailable")]
    CoordinatorUnavailable,

    /// Coordinator dropped the reply channel
    #[error("Response channel closed")]
    ResponseDropped,

    /// Presence channel refused an event
    #[error("Presence publish failed: {0}")]
    Publish(String),

    /// Presence subscription could not be opened
    #[error("Presence subscribe failed: {0}")]
    Subscribe(String),
}

impl LockError {
    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            LockError::CoordinatorUnavailable | LockError::ResponseDropped => "UNAVAILABLE",
            LockError::Publish(_) | LockError::Subscribe(_) => "PRESENCE_ERROR",
        }
    }
}
