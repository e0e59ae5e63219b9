//! Node, response and position commands.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use super::command::{Command, CommandContext};
use crate::errors::{HistoryError, HistoryResult};
use crate::graph_store::GraphStore;
use crate::model::{Edge, Node, NodePatch, NodePosition, Position};

fn existing(store: &GraphStore, id: &str) -> HistoryResult<Node> {
    store
        .get(id)
        .cloned()
        .ok_or_else(|| HistoryError::NodeNotFound(id.to_string()))
}

fn check_new_id(store: &GraphStore, id: &str) -> HistoryResult<()> {
    if id.trim().is_empty() {
        return Err(HistoryError::Invalid("node id must not be blank".to_string()));
    }
    if store.contains(id) {
        return Err(HistoryError::NodeAlreadyExists(id.to_string()));
    }
    Ok(())
}

async fn create(ctx: &CommandContext<'_>, node: &Node, index: Option<usize>) -> HistoryResult<()> {
    let stored = ctx.persist(ctx.remote.create_node(node)).await?;
    ctx.write(|store| match index {
        Some(index) => store.insert_at(index, stored),
        None => {
            store.insert(stored);
        }
    })
    .await;
    Ok(())
}

async fn delete(ctx: &CommandContext<'_>, id: &str) -> HistoryResult<Option<usize>> {
    ctx.persist(ctx.remote.delete_node(id)).await?;
    Ok(ctx.write(|store| store.remove(id).map(|(index, _)| index)).await)
}

async fn replace(ctx: &CommandContext<'_>, node: &Node) -> HistoryResult<()> {
    let stored = ctx.persist(ctx.remote.update_node(&node.id, node)).await?;
    ctx.write(|store| store.insert(stored)).await;
    Ok(())
}

#[derive(Debug)]
pub struct CreateNode {
    node: Node,
    label: String,
}

impl CreateNode {
    pub fn new(store: &GraphStore, node: Node) -> HistoryResult<Self> {
        check_new_id(store, &node.id)?;
        Ok(Self {
            label: format!("Create node '{}'", node.id),
            node,
        })
    }

    /// Copy of `source_id` under `new_id`, offset on the canvas. Responses
    /// are kept; nothing points at the copy yet.
    pub fn duplicate(store: &GraphStore, source_id: &str, new_id: &str) -> HistoryResult<Self> {
        let source = existing(store, source_id)?;
        check_new_id(store, new_id)?;
        let mut node = source.renamed(new_id);
        node.position = source
            .position
            .map(|p| Position::new(p.x + 40.0, p.y + 40.0));
        Ok(Self {
            label: format!("Duplicate node '{source_id}'"),
            node,
        })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }
}

#[async_trait]
impl Command for CreateNode {
    fn name(&self) -> String {
        self.label.clone()
    }

    fn node_ids(&self) -> Vec<String> {
        vec![self.node.id.clone()]
    }

    async fn redo(&mut self, ctx: &CommandContext<'_>) -> HistoryResult<()> {
        create(ctx, &self.node, None).await
    }

    async fn undo(&mut self, ctx: &CommandContext<'_>) -> HistoryResult<()> {
        delete(ctx, &self.node.id).await.map(|_| ())
    }
}

#[derive(Debug)]
pub struct DeleteNode {
    node: Node,
    index: Option<usize>,
}

impl DeleteNode {
    pub fn new(store: &GraphStore, id: &str) -> HistoryResult<Self> {
        Ok(Self {
            node: existing(store, id)?,
            index: store.index_of(id),
        })
    }
}

#[async_trait]
impl Command for DeleteNode {
    fn name(&self) -> String {
        format!("Delete node '{}'", self.node.id)
    }

    fn node_ids(&self) -> Vec<String> {
        vec![self.node.id.clone()]
    }

    async fn redo(&mut self, ctx: &CommandContext<'_>) -> HistoryResult<()> {
        if let Some(index) = delete(ctx, &self.node.id).await? {
            self.index = Some(index);
        }
        Ok(())
    }

    async fn undo(&mut self, ctx: &CommandContext<'_>) -> HistoryResult<()> {
        create(ctx, &self.node, self.index).await
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditKind {
    Content,
    AddResponse,
    RemoveResponse,
    UpdateResponse,
    MoveResponse,
}

/// Any change confined to one node's own record, kept as full before/after
/// copies.
#[derive(Debug)]
pub struct EditNode {
    kind: EditKind,
    before: Node,
    after: Node,
}

impl EditNode {
    fn new(kind: EditKind, before: Node, after: Node) -> Self {
        Self {
            kind,
            before,
            after,
        }
    }

    pub fn update(store: &GraphStore, id: &str, patch: &NodePatch) -> HistoryResult<Self> {
        if patch.is_empty() {
            return Err(HistoryError::Invalid("nothing to update".to_string()));
        }
        let before = existing(store, id)?;
        let after = patch.apply_to(&before);
        Ok(Self::new(EditKind::Content, before, after))
    }

    pub fn add_response(store: &GraphStore, id: &str, edge: Edge) -> HistoryResult<Self> {
        let before = existing(store, id)?;
        let mut after = before.clone();
        after.responses.push(edge);
        Ok(Self::new(EditKind::AddResponse, before, after))
    }

    pub fn remove_response(store: &GraphStore, id: &str, index: usize) -> HistoryResult<Self> {
        let before = existing(store, id)?;
        check_index(&before, index)?;
        let mut after = before.clone();
        after.responses.remove(index);
        Ok(Self::new(EditKind::RemoveResponse, before, after))
    }

    pub fn update_response(
        store: &GraphStore,
        id: &str,
        index: usize,
        edge: Edge,
    ) -> HistoryResult<Self> {
        let before = existing(store, id)?;
        check_index(&before, index)?;
        let mut after = before.clone();
        after.responses[index] = edge;
        Ok(Self::new(EditKind::UpdateResponse, before, after))
    }

    pub fn move_response(
        store: &GraphStore,
        id: &str,
        from: usize,
        to: usize,
    ) -> HistoryResult<Self> {
        let before = existing(store, id)?;
        check_index(&before, from)?;
        check_index(&before, to)?;
        let mut after = before.clone();
        let edge = after.responses.remove(from);
        after.responses.insert(to, edge);
        Ok(Self::new(EditKind::MoveResponse, before, after))
    }

    pub fn kind(&self) -> EditKind {
        self.kind
    }
}

fn check_index(node: &Node, index: usize) -> HistoryResult<()> {
    if index < node.responses.len() {
        Ok(())
    } else {
        Err(HistoryError::ResponseNotFound {
            node_id: node.id.clone(),
            index,
        })
    }
}

#[async_trait]
impl Command for EditNode {
    fn name(&self) -> String {
        let id = &self.before.id;
        match self.kind {
            EditKind::Content => format!("Edit node '{id}'"),
            EditKind::AddResponse => format!("Add response to '{id}'"),
            EditKind::RemoveResponse => format!("Remove response from '{id}'"),
            EditKind::UpdateResponse => format!("Edit response on '{id}'"),
            EditKind::MoveResponse => format!("Reorder responses on '{id}'"),
        }
    }

    fn node_ids(&self) -> Vec<String> {
        vec![self.before.id.clone()]
    }

    async fn redo(&mut self, ctx: &CommandContext<'_>) -> HistoryResult<()> {
        replace(ctx, &self.after).await
    }

    async fn undo(&mut self, ctx: &CommandContext<'_>) -> HistoryResult<()> {
        replace(ctx, &self.before).await
    }
}

/// Moves nodes on the canvas; used for drags and for applying a layout.
#[derive(Debug)]
pub struct SetPositions {
    before: Vec<(String, Option<Position>)>,
    after: Vec<NodePosition>,
}

impl SetPositions {
    /// Ids unknown to the store are skipped.
    pub fn new(store: &GraphStore, positions: Vec<NodePosition>) -> HistoryResult<Self> {
        let mut seen = HashSet::new();
        let after: Vec<NodePosition> = positions
            .into_iter()
            .filter(|p| store.contains(&p.id) && seen.insert(p.id.clone()))
            .collect();
        if after.is_empty() {
            return Err(HistoryError::Invalid("no known nodes to move".to_string()));
        }
        let before = after
            .iter()
            .map(|p| (p.id.clone(), store.get(&p.id).and_then(|n| n.position)))
            .collect();
        Ok(Self { before, after })
    }
}

#[async_trait]
impl Command for SetPositions {
    fn name(&self) -> String {
        match self.after.as_slice() {
            [single] => format!("Move node '{}'", single.id),
            many => format!("Move {} nodes", many.len()),
        }
    }

    fn node_ids(&self) -> Vec<String> {
        self.after.iter().map(|p| p.id.clone()).collect()
    }

    async fn redo(&mut self, ctx: &CommandContext<'_>) -> HistoryResult<()> {
        ctx.persist(ctx.remote.update_positions(&self.after)).await?;
        ctx.write(|store| {
            for p in &self.after {
                store.set_position(&p.id, Some(p.position()));
            }
        })
        .await;
        Ok(())
    }

    async fn undo(&mut self, ctx: &CommandContext<'_>) -> HistoryResult<()> {
        let restore: Vec<NodePosition> = self
            .before
            .iter()
            .filter_map(|(id, position)| position.map(|p| NodePosition::new(id.clone(), p)))
            .collect();
        if !restore.is_empty() {
            ctx.persist(ctx.remote.update_positions(&restore)).await?;
        }

        // Nodes that had no position: clear it through a full update.
        for (id, _) in self.before.iter().filter(|(_, p)| p.is_none()) {
            let cleared = ctx
                .read(|store| {
                    store.get(id).cloned().map(|mut node| {
                        node.position = None;
                        node
                    })
                })
                .await;
            if let Some(node) = cleared {
                debug!(node_id = %id, "Clearing position");
                replace(ctx, &node).await?;
            }
        }

        ctx.write(|store| {
            for (id, position) in &self.before {
                store.set_position(id, *position);
            }
        })
        .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeType;

    fn store() -> GraphStore {
        GraphStore::from_nodes(vec![
            Node::new("a", NodeType::Entry, "A", "a")
                .with_response("one", "b")
                .with_response("two", "b")
                .with_position(0.0, 0.0),
            Node::new("b", NodeType::Success, "B", "b"),
        ])
    }

    #[test]
    fn test_create_rejects_duplicates_and_blank_ids() {
        let store = store();
        let dup = CreateNode::new(&store, Node::new("a", NodeType::Pitch, "x", "y"));
        assert!(matches!(dup, Err(HistoryError::NodeAlreadyExists(_))));
        let blank = CreateNode::new(&store, Node::new(" ", NodeType::Pitch, "x", "y"));
        assert!(matches!(blank, Err(HistoryError::Invalid(_))));
    }

    #[test]
    fn test_duplicate_offsets_copy() {
        let cmd = CreateNode::duplicate(&store(), "a", "a_copy").unwrap();
        assert_eq!(cmd.node().id, "a_copy");
        assert_eq!(cmd.node().responses.len(), 2);
        assert_eq!(cmd.node().position, Some(Position::new(40.0, 40.0)));
        assert_eq!(cmd.name(), "Duplicate node 'a'");
    }

    #[test]
    fn test_move_response() {
        let cmd = EditNode::move_response(&store(), "a", 1, 0).unwrap();
        assert_eq!(cmd.after.responses[0].label, "two");
        assert_eq!(cmd.before.responses[0].label, "one");
    }

    #[test]
    fn test_response_index_checked() {
        let err = EditNode::remove_response(&store(), "a", 5).unwrap_err();
        assert!(matches!(err, HistoryError::ResponseNotFound { index: 5, .. }));
    }

    #[test]
    fn test_empty_patch_rejected() {
        let err = EditNode::update(&store(), "a", &NodePatch::default()).unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }

    #[test]
    fn test_set_positions_skips_unknown() {
        let cmd = SetPositions::new(
            &store(),
            vec![
                NodePosition::new("b", Position::new(5.0, 5.0)),
                NodePosition::new("ghost", Position::new(1.0, 1.0)),
            ],
        )
        .unwrap();
        assert_eq!(cmd.node_ids(), vec!["b".to_string()]);
        assert_eq!(cmd.before, vec![("b".to_string(), None)]);
    }
}
