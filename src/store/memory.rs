use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::Mutex;

use super::{RemoteStore, SnapshotStore};
use crate::errors::{StoreError, StoreResult};
use crate::model::{Node, NodePosition, Snapshot, SnapshotSummary};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreOp {
    ListNodes,
    CreateNode,
    UpdateNode,
    DeleteNode,
    UpdatePositions,
    CreateSnapshot,
    GetSnapshot,
    ListSnapshots,
}

/// Injected failure: matching calls fail with [`StoreError::Unavailable`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreFault {
    pub op: StoreOp,
    /// Only fail calls for this node; `None` matches any call of `op`
    pub node_id: Option<String>,
    /// Keep failing instead of failing once
    pub persistent: bool,
}

impl StoreFault {
    pub fn once(op: StoreOp) -> Self {
        Self {
            op,
            node_id: None,
            persistent: false,
        }
    }

    pub fn for_node(op: StoreOp, node_id: impl Into<String>) -> Self {
        Self {
            op,
            node_id: Some(node_id.into()),
            persistent: false,
        }
    }

    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

/// Record of a call that reached the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub node_id: Option<String>,
    pub succeeded: bool,
}

#[derive(Default)]
struct MemoryState {
    nodes: IndexMap<String, Node>,
    snapshots: Vec<Snapshot>,
    faults: Vec<StoreFault>,
    calls: Vec<StoreCall>,
    latency: Duration,
}

impl MemoryState {
    fn check(&mut self, op: StoreOp, node_id: Option<&str>) -> StoreResult<()> {
        let hit = self.faults.iter().position(|fault| {
            fault.op == op
                && match (&fault.node_id, node_id) {
                    (None, _) => true,
                    (Some(wanted), Some(id)) => wanted == id,
                    (Some(_), None) => false,
                }
        });
        let result = match hit {
            Some(index) => {
                if !self.faults[index].persistent {
                    self.faults.remove(index);
                }
                Err(StoreError::Unavailable(format!("injected {op:?} failure")))
            }
            None => Ok(()),
        };
        self.calls.push(StoreCall {
            op,
            node_id: node_id.map(str::to_string),
            succeeded: result.is_ok(),
        });
        result
    }
}

/// In-process store for tests and offline demos. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().await;
            for node in nodes {
                state.nodes.insert(node.id.clone(), node);
            }
        }
        store
    }

    pub async fn inject_fault(&self, fault: StoreFault) {
        self.state.lock().await.faults.push(fault);
    }

    pub async fn clear_faults(&self) {
        self.state.lock().await.faults.clear();
    }

    /// Delay applied to every call before it is served.
    pub async fn set_latency(&self, latency: Duration) {
        self.state.lock().await.latency = latency;
    }

    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn nodes(&self) -> Vec<Node> {
        self.state.lock().await.nodes.values().cloned().collect()
    }

    pub async fn node(&self, id: &str) -> Option<Node> {
        self.state.lock().await.nodes.get(id).cloned()
    }

    async fn delay(&self) {
        let latency = self.state.lock().await.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_nodes(&self) -> StoreResult<Vec<Node>> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.check(StoreOp::ListNodes, None)?;
        Ok(state.nodes.values().cloned().collect())
    }

    async fn create_node(&self, node: &Node) -> StoreResult<Node> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.check(StoreOp::CreateNode, Some(&node.id))?;
        if state.nodes.contains_key(&node.id) {
            return Err(StoreError::AlreadyExists(node.id.clone()));
        }
        state.nodes.insert(node.id.clone(), node.clone());
        Ok(node.clone())
    }

    async fn update_node(&self, id: &str, node: &Node) -> StoreResult<Node> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.check(StoreOp::UpdateNode, Some(id))?;
        match state.nodes.get_mut(id) {
            Some(stored) => {
                *stored = node.clone();
                Ok(node.clone())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn delete_node(&self, id: &str) -> StoreResult<()> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.check(StoreOp::DeleteNode, Some(id))?;
        state
            .nodes
            .shift_remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_positions(&self, positions: &[NodePosition]) -> StoreResult<()> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.check(StoreOp::UpdatePositions, None)?;
        for update in positions {
            if let Some(node) = state.nodes.get_mut(&update.id) {
                node.position = Some(update.position());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn create_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.check(StoreOp::CreateSnapshot, None)?;
        state.snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn get_snapshot(&self, id: &str) -> StoreResult<Snapshot> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.check(StoreOp::GetSnapshot, None)?;
        state
            .snapshots
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| StoreError::SnapshotNotFound(id.to_string()))
    }

    async fn list_snapshots(&self) -> StoreResult<Vec<SnapshotSummary>> {
        self.delay().await;
        let mut state = self.state.lock().await;
        state.check(StoreOp::ListSnapshots, None)?;
        let mut summaries: Vec<SnapshotSummary> =
            state.snapshots.iter().map(Snapshot::summary).collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }
}
