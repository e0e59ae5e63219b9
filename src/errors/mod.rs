//! Domain-specific error types for scriptgraph
//!
//! # Error Categories
//!
//! - **StoreError**: remote persistence calls (the command is not committed)
//! - **HistoryError**: command execution, undo/redo, rename migration
//! - **ImportExportError**: document parsing, import strategies, restore
//! - **LockError**: lock coordinator and presence channel failures
//! - **EditorError**: facade errors, wrapping the above plus read-only access
//!
//! Structural graph defects are not errors; they are reported as a list by
//! [`crate::validation`].
//!
//! # Examples
//!
//! ```rust
//! use scriptgraph::errors::{HistoryError, StoreError};
//!
//! fn save(ok: bool) -> Result<(), HistoryError> {
//!     if !ok {
//!         return Err(StoreError::Unavailable("timeout".to_string()).into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(save(false).unwrap_err().is_persistence_failure());
//! ```

pub mod editor;
pub mod history;
pub mod import_export;
pub mod lock;
pub mod store;

pub use editor::EditorError;
pub use history::{HistoryError, MigrationStep};
pub use import_export::ImportExportError;
pub use lock::LockError;
pub use store::StoreError;

/// Result type alias for remote store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Result type alias for import/export operations
pub type ImportExportResult<T> = Result<T, ImportExportError>;

/// Result type alias for lock operations
pub type LockResult<T> = Result<T, LockError>;

/// Result type alias for editor operations
pub type EditorResult<T> = Result<T, EditorError>;
