//! Collaborative editing core for branching conversation scripts.
//!
//! A script is a directed graph of [`model::Node`]s joined by labeled
//! [`model::Edge`]s. The crate keeps a local mirror of the graph
//! ([`graph_store::GraphStore`]), derives navigable views from it
//! ([`tree`], [`layout`], [`validation`]), wraps every mutation in an undoable
//! command ([`history`]) that persists through a [`store::RemoteStore`], and
//! coordinates per-node edit rights between editors ([`locks`]).
//!
//! [`editor::EditorContext`] wires these pieces together for a presentation
//! layer.

pub mod config;
pub mod confirm;
pub mod errors;
pub mod graph_store;
pub mod history;
pub mod layout;
pub mod locks;
pub mod model;
pub mod presence;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod tree;
pub mod validation;

#[cfg(feature = "sqlite")]
pub mod database;

pub mod editor;

pub use config::EditorConfig;
pub use editor::EditorContext;
pub use graph_store::GraphStore;
