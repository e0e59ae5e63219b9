//! Persistence seams and their adapters.
//!
//! The remote store is the source of truth but offers no transactions and no
//! locking: every call stands alone and the last write wins.

mod memory;

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "sqlite")]
mod sqlite;

use async_trait::async_trait;

use crate::errors::StoreResult;
use crate::model::{Node, NodePosition, Snapshot, SnapshotSummary};

pub use memory::{MemoryStore, StoreCall, StoreFault, StoreOp};

#[cfg(feature = "http")]
pub use http::{HttpRemoteStore, HttpStoreConfig};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Node persistence.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_nodes(&self) -> StoreResult<Vec<Node>>;

    /// Creates a node and returns it as stored.
    async fn create_node(&self, node: &Node) -> StoreResult<Node>;

    /// Replaces the node stored under `id` and returns it as stored.
    async fn update_node(&self, id: &str, node: &Node) -> StoreResult<Node>;

    async fn delete_node(&self, id: &str) -> StoreResult<()>;

    /// Bulk position update; ids the store does not know are skipped.
    async fn update_positions(&self, positions: &[NodePosition]) -> StoreResult<()>;
}

/// Append-only snapshot persistence.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn create_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()>;

    async fn get_snapshot(&self, id: &str) -> StoreResult<Snapshot>;

    /// Newest first.
    async fn list_snapshots(&self) -> StoreResult<Vec<SnapshotSummary>>;
}
