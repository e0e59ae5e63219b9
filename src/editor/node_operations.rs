use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::session::{EditMode, NodeSession};
use super::EditorContext;
use crate::confirm::{ConfirmScope, Confirmation, Impact};
use crate::errors::{EditorError, EditorResult};
use crate::history::{Command, CreateNode, DeleteNode, EditNode, RenameNode, SetPositions};
use crate::locks::LockState;
use crate::model::{Edge, Node, NodePatch, NodePosition, Position};

/// Preview of a node deletion.
#[derive(Clone, Debug, Serialize)]
pub struct DeletePlan {
    pub node_id: String,
    /// Edges from other nodes that will dangle, as `(source_id, index)`
    pub incoming: Vec<(String, usize)>,
    confirmation: Option<Confirmation>,
}

impl DeletePlan {
    /// Present when the delete leaves other nodes pointing nowhere.
    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }
}

impl EditorContext {
    pub async fn open_node(&self, node_id: &str) -> EditorResult<NodeSession> {
        self.open_node_with(node_id, &CancellationToken::new()).await
    }

    /// Claims `node_id` for editing. A node held elsewhere opens read-only.
    pub async fn open_node_with(
        &self,
        node_id: &str,
        cancel: &CancellationToken,
    ) -> EditorResult<NodeSession> {
        if !self.store.read().await.contains(node_id) {
            return Err(EditorError::NodeNotFound(node_id.to_string()));
        }
        let mode = EditMode::from(self.locks.acquire_with(node_id, cancel).await);
        debug!(node_id, ?mode, "Opened node");
        Ok(NodeSession::new(node_id.to_string(), mode, self.locks.clone()))
    }

    /// Fails with [`EditorError::ReadOnly`] if another editor holds any of `ids`.
    pub async fn ensure_writable(&self, ids: &[String]) -> EditorResult<()> {
        for id in ids {
            if let LockState::LockedByOther { holder } = self.locks.state(id).await? {
                return Err(EditorError::ReadOnly {
                    node_id: id.clone(),
                    holder,
                });
            }
        }
        Ok(())
    }

    /// Fails unless this editor holds `node_id`, as [`Self::open_node`] arranges.
    pub async fn ensure_claimed(&self, node_id: &str) -> EditorResult<()> {
        match self.locks.state(node_id).await? {
            LockState::LockedByMe => Ok(()),
            LockState::LockedByOther { holder } => Err(EditorError::ReadOnly {
                node_id: node_id.to_string(),
                holder,
            }),
            LockState::Unlocked => Err(EditorError::NotClaimed(node_id.to_string())),
        }
    }

    pub(crate) async fn run(&self, command: Box<dyn Command>) -> EditorResult<()> {
        self.run_with(command, &CancellationToken::new()).await
    }

    /// Runs an edit of existing content in `node_id`, which must be claimed.
    async fn run_claimed(&self, node_id: &str, command: Box<dyn Command>) -> EditorResult<()> {
        self.ensure_claimed(node_id).await?;
        self.run(command).await
    }

    pub async fn run_with(
        &self,
        command: Box<dyn Command>,
        cancel: &CancellationToken,
    ) -> EditorResult<()> {
        self.ensure_writable(&command.node_ids()).await?;
        self.history.execute_with(command, cancel).await?;
        Ok(())
    }

    pub async fn create_node(&self, node: Node) -> EditorResult<()> {
        let cmd = CreateNode::new(&*self.store.read().await, node)?;
        self.run(Box::new(cmd)).await
    }

    pub async fn update_node(&self, id: &str, patch: &NodePatch) -> EditorResult<()> {
        let cmd = EditNode::update(&*self.store.read().await, id, patch)?;
        self.run_claimed(id, Box::new(cmd)).await
    }

    pub async fn add_response(&self, id: &str, edge: Edge) -> EditorResult<()> {
        let cmd = EditNode::add_response(&*self.store.read().await, id, edge)?;
        self.run_claimed(id, Box::new(cmd)).await
    }

    pub async fn remove_response(&self, id: &str, index: usize) -> EditorResult<()> {
        let cmd = EditNode::remove_response(&*self.store.read().await, id, index)?;
        self.run_claimed(id, Box::new(cmd)).await
    }

    pub async fn update_response(&self, id: &str, index: usize, edge: Edge) -> EditorResult<()> {
        let cmd = EditNode::update_response(&*self.store.read().await, id, index, edge)?;
        self.run_claimed(id, Box::new(cmd)).await
    }

    pub async fn move_response(&self, id: &str, from: usize, to: usize) -> EditorResult<()> {
        let cmd = EditNode::move_response(&*self.store.read().await, id, from, to)?;
        self.run_claimed(id, Box::new(cmd)).await
    }

    pub async fn move_node(&self, id: &str, position: Position) -> EditorResult<()> {
        self.set_positions(vec![NodePosition::new(id, position)]).await
    }

    pub async fn set_positions(&self, positions: Vec<NodePosition>) -> EditorResult<()> {
        let cmd = SetPositions::new(&*self.store.read().await, positions)?;
        self.run(Box::new(cmd)).await
    }

    pub async fn duplicate_node(&self, source_id: &str, new_id: &str) -> EditorResult<()> {
        let cmd = CreateNode::duplicate(&*self.store.read().await, source_id, new_id)?;
        self.run(Box::new(cmd)).await
    }

    /// Renames a claimed node and repoints every referrer. Referrers held
    /// by another editor block the rename.
    pub async fn rename_node(&self, from: &str, to: &str) -> EditorResult<()> {
        let cmd = RenameNode::new(&*self.store.read().await, from, to)?;
        self.run_claimed(from, Box::new(cmd)).await
    }

    pub async fn plan_delete(&self, node_id: &str) -> EditorResult<DeletePlan> {
        let store = self.store.read().await;
        if !store.contains(node_id) {
            return Err(EditorError::NodeNotFound(node_id.to_string()));
        }
        let incoming: Vec<(String, usize)> = store
            .incoming_edges(node_id)
            .into_iter()
            .filter(|(source, _)| source != node_id)
            .collect();
        let confirmation = (!incoming.is_empty()).then(|| {
            Confirmation::new(
                ConfirmScope::DeleteNode(node_id.to_string()),
                Impact {
                    nodes: 1,
                    edges: incoming.len(),
                },
            )
        });
        Ok(DeletePlan {
            node_id: node_id.to_string(),
            incoming,
            confirmation,
        })
    }

    /// Deletes a claimed node. A node other nodes point at needs a
    /// confirmation from [`Self::plan_delete`] whose impact still holds.
    pub async fn delete_node(
        &self,
        node_id: &str,
        confirmation: Option<&Confirmation>,
    ) -> EditorResult<()> {
        let plan = self.plan_delete(node_id).await?;
        if let Some(required) = plan.confirmation() {
            if !confirmation.is_some_and(|c| c.covers(required)) {
                return Err(EditorError::ConfirmationRequired(required.scope().to_string()));
            }
        }
        let cmd = DeleteNode::new(&*self.store.read().await, node_id)?;
        self.run_claimed(node_id, Box::new(cmd)).await
    }

    /// Reverts the last command; `None` when there was nothing to undo.
    pub async fn undo(&self) -> EditorResult<Option<String>> {
        if let Some(ids) = self.history.undo_targets() {
            self.ensure_writable(&ids).await?;
        }
        Ok(self.history.undo().await?)
    }

    pub async fn redo(&self) -> EditorResult<Option<String>> {
        if let Some(ids) = self.history.redo_targets() {
            self.ensure_writable(&ids).await?;
        }
        Ok(self.history.redo().await?)
    }
}
