//! Import and export error types
//!
//! A malformed document is rejected with [`ImportExportError::InvalidFormat`]
//! or [`ImportExportError::DuplicateNode`] before the live graph is touched.
//!
//! # Examples
//!
//! ```rust
//! use scriptgraph::errors::ImportExportError;
//!
//! let err = ImportExportError::InvalidFormat("missing nodes".to_string());
//! assert!(err.is_client_error());
//! assert_eq!(err.error_code(), "INVALID_FORMAT");
//! ```

use thiserror::Error;

use super::store::StoreError;

/// Import, export and snapshot restore errors
#[derive(Error, Debug)]
pub enum ImportExportError {
    /// Document does not have the expected shape
    #[error("Invalid document format: {0}")]
    InvalidFormat(String),

    /// Document lists the same node id twice
    #[error("Duplicate node id in document: {0}")]
    DuplicateNode(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Destructive operation attempted without a matching confirmation
    #[error("Confirmation required: {0}")]
    ConfirmationRequired(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote store failed before any node was written
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Remote store failed partway through a bulk write
    #[error("Bulk write interrupted after {completed} of {total} operations: {source}")]
    Interrupted {
        /// Operations persisted and mirrored locally
        completed: usize,
        /// Operations planned
        total: usize,
        /// Underlying persistence failure
        #[source]
        source: StoreError,
    },
}

impl ImportExportError {
    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ImportExportError::InvalidFormat(_)
                | ImportExportError::DuplicateNode(_)
                | ImportExportError::UnsupportedFormat(_)
                | ImportExportError::ConfirmationRequired(_)
                | ImportExportError::Yaml(_)
                | ImportExportError::Serialization(_)
        )
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ImportExportError::InvalidFormat(_) => "INVALID_FORMAT",
            ImportExportError::DuplicateNode(_) => "DUPLICATE_NODE",
            ImportExportError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            ImportExportError::ConfirmationRequired(_) => "CONFIRMATION_REQUIRED",
            ImportExportError::Serialization(_) => "SERIALIZATION_ERROR",
            ImportExportError::Yaml(_) => "YAML_ERROR",
            ImportExportError::Io(_) => "IO_ERROR",
            ImportExportError::Store(_) => "STORE_ERROR",
            ImportExportError::Interrupted { .. } => "INTERRUPTED",
        }
    }
}

impl From<serde_yaml::Error> for ImportExportError {
    fn from(err: serde_yaml::Error) -> Self {
        ImportExportError::Yaml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_node() {
        let err = ImportExportError::DuplicateNode("q1".to_string());
        assert_eq!(err.to_string(), "Duplicate node id in document: q1");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_interrupted_reports_progress() {
        let err = ImportExportError::Interrupted {
            completed: 3,
            total: 7,
            source: StoreError::Unavailable("reset".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Bulk write interrupted after 3 of 7 operations: Remote store unavailable: reset"
        );
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("a: [b").unwrap_err();
        let err = ImportExportError::from(yaml_err);
        assert_eq!(err.error_code(), "YAML_ERROR");
    }
}
