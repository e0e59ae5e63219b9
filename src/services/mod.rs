//! Bulk operations that bypass the undo history: export, import and snapshots.

pub mod export_service;
pub mod import_service;
pub mod snapshot_service;

pub use export_service::*;
pub use import_service::*;
pub use snapshot_service::*;
