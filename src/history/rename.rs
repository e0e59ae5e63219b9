//! Renaming a node is a migration, not an in-place edit: ids are immutable
//! once referenced, and the remote store has no transactions.
//!
//! Redo creates the node under its new id, points every referrer at it, then
//! deletes the old record. Undo runs the same steps in reverse. A failure on
//! the first step changes nothing; any later failure stops where it is and
//! reports [`HistoryError::MigrationPartialFailure`], with the local graph
//! mirroring exactly what was persisted.

use async_trait::async_trait;
use tracing::{info, warn};

use super::command::{store_cause, Command, CommandContext};
use crate::errors::{HistoryError, HistoryResult, MigrationStep};
use crate::graph_store::GraphStore;
use crate::model::Node;

#[derive(Debug)]
struct Referrer {
    before: Node,
    after: Node,
}

#[derive(Debug)]
pub struct RenameNode {
    from: String,
    to: String,
    original: Node,
    renamed: Node,
    referrers: Vec<Referrer>,
}

impl RenameNode {
    pub fn new(store: &GraphStore, from: &str, to: &str) -> HistoryResult<Self> {
        let original = store
            .get(from)
            .cloned()
            .ok_or_else(|| HistoryError::NodeNotFound(from.to_string()))?;
        if to.trim().is_empty() {
            return Err(HistoryError::Invalid("node id must not be blank".to_string()));
        }
        if to == from {
            return Err(HistoryError::Invalid(format!("node is already named '{to}'")));
        }
        if store.contains(to) {
            return Err(HistoryError::NodeAlreadyExists(to.to_string()));
        }

        let referrers = store
            .referrers(from)
            .into_iter()
            .filter_map(|id| store.get(&id).cloned())
            .map(|before| {
                let mut after = before.clone();
                after.retarget(from, to);
                Referrer { before, after }
            })
            .collect();

        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
            renamed: original.renamed(to),
            original,
            referrers,
        })
    }

    pub fn referrer_ids(&self) -> Vec<String> {
        self.referrers.iter().map(|r| r.before.id.clone()).collect()
    }

    fn partial(
        &self,
        step: MigrationStep,
        reverting: bool,
        done: usize,
        err: HistoryError,
    ) -> HistoryError {
        let ids = self.referrer_ids();
        let (rewritten, pending) = ids.split_at(done.min(ids.len()));
        warn!(
            from = %self.from,
            to = %self.to,
            %step,
            reverting,
            "Rename stopped partway: {}",
            err
        );
        HistoryError::MigrationPartialFailure {
            from_id: self.from.clone(),
            to_id: self.to.clone(),
            step,
            reverting,
            rewritten: rewritten.to_vec(),
            pending: pending.to_vec(),
            source: store_cause(err),
        }
    }

    /// Creates `node` locally next to `anchor` so the final delete leaves it
    /// in the anchor's slot.
    async fn create_beside(
        ctx: &CommandContext<'_>,
        node: &Node,
        anchor: &str,
        before_anchor: bool,
    ) -> HistoryResult<()> {
        let stored = ctx.persist(ctx.remote.create_node(node)).await?;
        ctx.write(|store| {
            let index = match store.index_of(anchor) {
                Some(i) if before_anchor => i,
                Some(i) => i + 1,
                None => store.len(),
            };
            store.insert_at(index, stored);
        })
        .await;
        Ok(())
    }

    async fn rewrite(
        &self,
        ctx: &CommandContext<'_>,
        reverting: bool,
    ) -> Result<(), (usize, HistoryError)> {
        for (done, referrer) in self.referrers.iter().enumerate() {
            let target = if reverting {
                &referrer.before
            } else {
                &referrer.after
            };
            let stored = ctx
                .persist(ctx.remote.update_node(&target.id, target))
                .await
                .map_err(|err| (done, err))?;
            ctx.write(|store| store.insert(stored)).await;
        }
        Ok(())
    }

    async fn remove(ctx: &CommandContext<'_>, id: &str) -> HistoryResult<()> {
        ctx.persist(ctx.remote.delete_node(id)).await?;
        ctx.write(|store| store.remove(id)).await;
        Ok(())
    }
}

#[async_trait]
impl Command for RenameNode {
    fn name(&self) -> String {
        format!("Rename '{}' to '{}'", self.from, self.to)
    }

    fn node_ids(&self) -> Vec<String> {
        let mut ids = vec![self.from.clone(), self.to.clone()];
        ids.extend(self.referrer_ids());
        ids
    }

    async fn redo(&mut self, ctx: &CommandContext<'_>) -> HistoryResult<()> {
        Self::create_beside(ctx, &self.renamed, &self.from, false).await?;

        if let Err((done, err)) = self.rewrite(ctx, false).await {
            return Err(self.partial(MigrationStep::RewriteReferences, false, done, err));
        }

        if let Err(err) = Self::remove(ctx, &self.from).await {
            let done = self.referrers.len();
            return Err(self.partial(MigrationStep::DeleteSource, false, done, err));
        }

        info!(
            from = %self.from,
            to = %self.to,
            referrers = self.referrers.len(),
            "Renamed node"
        );
        Ok(())
    }

    async fn undo(&mut self, ctx: &CommandContext<'_>) -> HistoryResult<()> {
        Self::create_beside(ctx, &self.original, &self.to, true).await?;

        if let Err((done, err)) = self.rewrite(ctx, true).await {
            return Err(self.partial(MigrationStep::RewriteReferences, true, done, err));
        }

        if let Err(err) = Self::remove(ctx, &self.to).await {
            let done = self.referrers.len();
            return Err(self.partial(MigrationStep::DeleteSource, true, done, err));
        }

        info!(from = %self.to, to = %self.from, "Reverted rename");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeType;

    fn store() -> GraphStore {
        GraphStore::from_nodes(vec![
            Node::new("start", NodeType::Entry, "S", "s").with_response("go", "a"),
            Node::new("a", NodeType::Question, "A", "a")
                .with_response("again", "a")
                .with_response("next", "end"),
            Node::new("side", NodeType::Pitch, "P", "p").with_response("back", "a"),
            Node::new("end", NodeType::Success, "E", "e"),
        ])
    }

    #[test]
    fn test_precomputes_referrers() {
        let cmd = RenameNode::new(&store(), "a", "b").unwrap();
        assert_eq!(cmd.referrer_ids(), vec!["start", "side"]);
        assert_eq!(cmd.renamed.responses[0].target_id, "b");
        assert_eq!(cmd.referrers[0].after.responses[0].target_id, "b");
        assert_eq!(cmd.node_ids(), vec!["a", "b", "start", "side"]);
    }

    #[test]
    fn test_rejects_existing_target() {
        let err = RenameNode::new(&store(), "a", "end").unwrap_err();
        assert!(matches!(err, HistoryError::NodeAlreadyExists(id) if id == "end"));
        assert!(RenameNode::new(&store(), "a", "a").is_err());
        assert!(RenameNode::new(&store(), "zzz", "b").is_err());
    }

    #[test]
    fn test_partial_splits_referrers() {
        let cmd = RenameNode::new(&store(), "a", "b").unwrap();
        let err = cmd.partial(
            MigrationStep::RewriteReferences,
            false,
            1,
            HistoryError::Cancelled,
        );
        match err {
            HistoryError::MigrationPartialFailure {
                rewritten, pending, ..
            } => {
                assert_eq!(rewritten, vec!["start"]);
                assert_eq!(pending, vec!["side"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
