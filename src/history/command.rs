use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::errors::{HistoryError, HistoryResult, StoreError, StoreResult};
use crate::graph_store::GraphStore;
use crate::store::RemoteStore;

/// What a command may touch while it runs.
pub struct CommandContext<'a> {
    pub store: &'a RwLock<GraphStore>,
    pub remote: &'a dyn RemoteStore,
    pub cancel: &'a CancellationToken,
}

impl CommandContext<'_> {
    /// Awaits a remote call unless the command is cancelled first.
    pub async fn persist<T, F>(&self, call: F) -> HistoryResult<T>
    where
        F: Future<Output = StoreResult<T>> + Send,
        T: Send,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(HistoryError::Cancelled),
            result = call => result.map_err(HistoryError::from),
        }
    }

    pub async fn read<R>(&self, f: impl FnOnce(&GraphStore) -> R + Send) -> R {
        let store = self.store.read().await;
        f(&store)
    }

    pub async fn write<R>(&self, f: impl FnOnce(&mut GraphStore) -> R + Send) -> R {
        let mut store = self.store.write().await;
        f(&mut store)
    }
}

/// A reversible edit. `redo` and `undo` each persist first and only then
/// update the local graph, so a failed call leaves the graph as it was.
#[async_trait]
pub trait Command: Send + Sync + fmt::Debug {
    /// Label shown next to undo/redo controls.
    fn name(&self) -> String;

    /// Nodes this command reads or writes; used to reject overlapping edits.
    fn node_ids(&self) -> Vec<String>;

    async fn redo(&mut self, ctx: &CommandContext<'_>) -> HistoryResult<()>;

    async fn undo(&mut self, ctx: &CommandContext<'_>) -> HistoryResult<()>;
}

/// Collapses a command failure into the store error that caused it.
pub(crate) fn store_cause(err: HistoryError) -> StoreError {
    match err {
        HistoryError::Persistence(source) => source,
        HistoryError::Cancelled => StoreError::Cancelled,
        other => StoreError::Unavailable(other.to_string()),
    }
}
