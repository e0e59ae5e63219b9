//! Facade that wires the editing components together for one editor.
//!
//! ```text
//! UI action -> EditorContext -> Command -> HistoryEngine -> RemoteStore
//!                                                        -> GraphStore
//! ```
//!
//! Commands are refused for nodes another editor holds, and edits to an
//! existing node's content need this editor's own claim from `open_node`.
//! Views (tree, validation, layout) are derived from the local graph on
//! demand.

mod document_operations;
mod node_operations;
mod session;
mod view_operations;

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::config::EditorConfig;
use crate::errors::EditorResult;
use crate::graph_store::GraphStore;
use crate::history::HistoryEngine;
use crate::layout::LayoutEngine;
use crate::locks::{LockCoordinator, LockHandle};
use crate::presence::PresenceChannel;
use crate::services::{ImportService, SnapshotService};
use crate::store::{MemoryStore, RemoteStore, SnapshotStore};

pub use node_operations::DeletePlan;
pub use session::{EditMode, NodeSession};

pub struct EditorContext {
    config: EditorConfig,
    store: Arc<RwLock<GraphStore>>,
    remote: Arc<dyn RemoteStore>,
    history: HistoryEngine,
    locks: LockHandle,
    importer: ImportService,
    snapshots: SnapshotService,
    layout: LayoutEngine,
}

impl EditorContext {
    /// Starts an editor with an empty local graph; call [`Self::load`] to
    /// fill it from the store.
    pub async fn new(
        config: EditorConfig,
        remote: Arc<dyn RemoteStore>,
        snapshots: Arc<dyn SnapshotStore>,
        presence: Arc<dyn PresenceChannel>,
    ) -> EditorResult<Self> {
        let store = Arc::new(RwLock::new(GraphStore::new()));
        let locks = LockCoordinator::spawn(config.lock_settings(), presence).await?;
        let history = HistoryEngine::new(
            Arc::clone(&store),
            Arc::clone(&remote),
            config.history_depth,
        );
        let importer = ImportService::new(Arc::clone(&store), Arc::clone(&remote));
        let snapshots = SnapshotService::new(Arc::clone(&store), Arc::clone(&remote), snapshots);
        let layout = LayoutEngine::new(config.layout.clone());

        info!(holder = %config.holder, "Editor started");
        Ok(Self {
            config,
            store,
            remote,
            history,
            locks,
            importer,
            snapshots,
            layout,
        })
    }

    /// Picks the store adapter from the config (remote URL, then SQLite
    /// file, then an in-process store) and loads the graph.
    pub async fn connect(
        config: EditorConfig,
        presence: Arc<dyn PresenceChannel>,
    ) -> EditorResult<Self> {
        let (remote, snapshots) = Self::adapters(&config).await?;
        let editor = Self::new(config, remote, snapshots, presence).await?;
        editor.load().await?;
        Ok(editor)
    }

    async fn adapters(
        config: &EditorConfig,
    ) -> EditorResult<(Arc<dyn RemoteStore>, Arc<dyn SnapshotStore>)> {
        #[cfg(feature = "http")]
        if let Some(base_url) = &config.remote_base_url {
            let http = crate::store::HttpRemoteStore::new(&crate::store::HttpStoreConfig {
                base_url: base_url.clone(),
                api_token: config.api_token.clone(),
                timeout: config.request_timeout(),
            })?;
            let http = Arc::new(http);
            return Ok((http.clone(), http));
        }

        #[cfg(feature = "sqlite")]
        if let Some(path) = &config.database_path {
            let sqlite = Arc::new(crate::store::SqliteStore::connect(path).await?);
            return Ok((sqlite.clone(), sqlite));
        }

        let memory = Arc::new(MemoryStore::new());
        Ok((memory.clone(), memory))
    }

    /// Replaces the local graph with the store's contents and forgets history.
    pub async fn load(&self) -> EditorResult<usize> {
        let nodes = self.remote.list_nodes().await?;
        let count = nodes.len();
        self.store.write().await.replace_all(nodes);
        self.history.clear();
        info!(nodes = count, "Script loaded");
        Ok(count)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn holder(&self) -> &str {
        self.locks.holder()
    }

    pub fn store(&self) -> &Arc<RwLock<GraphStore>> {
        &self.store
    }

    pub fn history(&self) -> &HistoryEngine {
        &self.history
    }

    pub fn locks(&self) -> &LockHandle {
        &self.locks
    }

    /// Releases every lock, announces departure and stops the coordinator.
    pub async fn shutdown(&self) -> EditorResult<()> {
        self.locks.shutdown().await?;
        info!(holder = %self.holder(), "Editor stopped");
        Ok(())
    }
}
