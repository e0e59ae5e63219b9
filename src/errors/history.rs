//! Undo/redo history error types
//!
//! # Examples
//!
//! ```rust
//! use scriptgraph::errors::{HistoryError, StoreError};
//!
//! let err = HistoryError::from(StoreError::Unavailable("timeout".to_string()));
//! assert!(err.is_persistence_failure());
//! assert_eq!(err.error_code(), "SAVE_FAILED");
//! ```

use std::fmt;

use thiserror::Error;

use super::store::StoreError;

/// Step of the rename migration that was running when it failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationStep {
    /// Creating the node under its new id
    CreateTarget,
    /// Pointing referrers at the new id
    RewriteReferences,
    /// Deleting the node under its old id
    DeleteSource,
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MigrationStep::CreateTarget => "create target",
            MigrationStep::RewriteReferences => "rewrite references",
            MigrationStep::DeleteSource => "delete source",
        };
        f.write_str(name)
    }
}

/// History engine and command errors
#[derive(Error, Debug)]
pub enum HistoryError {
    /// Remote call failed; the command was not committed
    #[error("Save failed: {0}")]
    Persistence(#[from] StoreError),

    /// Another command touching this node has not resolved yet
    #[error("Node '{0}' has an edit in flight")]
    NodeBusy(String),

    /// Command refers to a node missing from the local graph
    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    /// Command would create a duplicate id
    #[error("Node '{0}' already exists")]
    NodeAlreadyExists(String),

    /// Response index out of range
    #[error("Response {index} not found on node '{node_id}'")]
    ResponseNotFound {
        /// Node owning the responses
        node_id: String,
        /// Requested index
        index: usize,
    },

    /// Command arguments rejected before any remote call
    #[error("Invalid edit: {0}")]
    Invalid(String),

    /// Command was cancelled before its remote call resolved
    #[error("Edit cancelled")]
    Cancelled,

    /// Rename stopped partway; the graph may hold dangling or duplicated references
    #[error(
        "{}",
        migration_message(.from_id, .to_id, .step, .reverting, .rewritten, .pending, .source)
    )]
    MigrationPartialFailure {
        /// Id the migration moves away from
        from_id: String,
        /// Id the migration moves to
        to_id: String,
        /// Step that failed
        step: MigrationStep,
        /// True when the failure happened while undoing a rename
        reverting: bool,
        /// Referrers already pointing at `to_id`
        rewritten: Vec<String>,
        /// Referrers still pointing at `from_id`
        pending: Vec<String>,
        /// Underlying persistence failure
        #[source]
        source: StoreError,
    },
}

fn migration_message(
    from_id: &str,
    to_id: &str,
    step: &MigrationStep,
    reverting: &bool,
    rewritten: &[String],
    pending: &[String],
    source: &StoreError,
) -> String {
    format!(
        "Rename {} -> {} failed during {}{}: {}. Rewritten referrers: [{}]; pending: [{}]. \
         Run validation and repair broken references.",
        from_id,
        to_id,
        step,
        if *reverting { " (undo)" } else { "" },
        source,
        rewritten.join(", "),
        pending.join(", ")
    )
}

impl HistoryError {
    /// Check if the failure came from the remote store
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            HistoryError::Persistence(_) | HistoryError::MigrationPartialFailure { .. }
        )
    }

    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HistoryError::NodeNotFound(_)
                | HistoryError::NodeAlreadyExists(_)
                | HistoryError::ResponseNotFound { .. }
                | HistoryError::Invalid(_)
        )
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            HistoryError::Persistence(_) => "SAVE_FAILED",
            HistoryError::NodeBusy(_) => "BUSY",
            HistoryError::NodeNotFound(_) | HistoryError::ResponseNotFound { .. } => "NOT_FOUND",
            HistoryError::NodeAlreadyExists(_) => "CONFLICT",
            HistoryError::Invalid(_) => "VALIDATION_FAILED",
            HistoryError::Cancelled => "CANCELLED",
            HistoryError::MigrationPartialFailure { .. } => "MIGRATION_PARTIAL_FAILURE",
        }
    }
}
