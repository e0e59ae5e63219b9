//! SQLite persistence for the script graph and its snapshots.

pub mod connection;
pub mod entities;
pub mod migrations;

pub use connection::*;
pub use entities::*;
