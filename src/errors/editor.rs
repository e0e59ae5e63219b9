//! Editor facade error types

use thiserror::Error;

use super::{HistoryError, ImportExportError, LockError, StoreError};

/// Errors surfaced by [`crate::editor::EditorContext`]
#[derive(Error, Debug)]
pub enum EditorError {
    /// Node is locked by another editor; only read access is available
    #[error("Node '{node_id}' is being edited by {holder}")]
    ReadOnly {
        /// Locked node
        node_id: String,
        /// Editor holding the lock
        holder: String,
    },

    /// Edit of a node this editor has not opened
    #[error("Node '{0}' must be opened before it is edited")]
    NotClaimed(String),

    /// Node not present in the local graph
    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    /// Destructive operation attempted without a matching confirmation
    #[error("Confirmation required: {0}")]
    ConfirmationRequired(String),

    /// Undo/redo or command failure
    #[error(transparent)]
    History(#[from] HistoryError),

    /// Import, export or restore failure
    #[error(transparent)]
    ImportExport(#[from] ImportExportError),

    /// Direct persistence failure (load, snapshot listing)
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Lock coordinator failure
    #[error(transparent)]
    Lock(#[from] LockError),
}

impl EditorError {
    /// Failed saves, as opposed to read-only or validation outcomes
    pub fn is_save_failure(&self) -> bool {
        match self {
            EditorError::History(err) => err.is_persistence_failure(),
            EditorError::Store(_) => true,
            EditorError::ImportExport(
                ImportExportError::Store(_) | ImportExportError::Interrupted { .. },
            ) => true,
            _ => false,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            EditorError::ReadOnly { .. } => "READ_ONLY",
            EditorError::NotClaimed(_) => "NOT_CLAIMED",
            EditorError::NodeNotFound(_) => "NOT_FOUND",
            EditorError::ConfirmationRequired(_) => "CONFIRMATION_REQUIRED",
            EditorError::History(err) => err.error_code(),
            EditorError::ImportExport(err) => err.error_code(),
            EditorError::Store(err) => err.error_code(),
            EditorError::Lock(err) => err.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_is_not_save_failure() {
        let err = EditorError::ReadOnly {
            node_id: "q1".to_string(),
            holder: "alice".to_string(),
        };
        assert_eq!(err.to_string(), "Node 'q1' is being edited by alice");
        assert!(!err.is_save_failure());
        assert_eq!(err.error_code(), "READ_ONLY");
    }

    #[test]
    fn test_not_claimed_code() {
        let err = EditorError::NotClaimed("q1".to_string());
        assert_eq!(err.error_code(), "NOT_CLAIMED");
        assert!(!err.is_save_failure());
    }

    #[test]
    fn test_history_persistence_is_save_failure() {
        let err = EditorError::from(HistoryError::from(StoreError::Unavailable(
            "down".to_string(),
        )));
        assert!(err.is_save_failure());
        assert_eq!(err.error_code(), "SAVE_FAILED");
    }
}
