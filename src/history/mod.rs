//! Command-based undo/redo.
//!
//! Every mutation of the script is a [`Command`] run through the
//! [`HistoryEngine`]. Bulk replacements (overwrite import, snapshot restore)
//! bypass it and clear it instead.

mod command;
mod commands;
mod engine;
mod rename;

pub use command::{Command, CommandContext};
pub use commands::{CreateNode, DeleteNode, EditKind, EditNode, SetPositions};
pub use engine::HistoryEngine;
pub use rename::RenameNode;
