use std::collections::HashMap;

use tracing::info;

use super::EditorContext;
use crate::errors::EditorResult;
use crate::graph_store::GraphStats;
use crate::history::SetPositions;
use crate::layout::{LayoutResult, NodeSize};
use crate::locks::LockState;
use crate::model::NodePosition;
use crate::tree::{build_forest, Forest};
use crate::validation::{ValidationReport, Validator};

impl EditorContext {
    pub async fn tree(&self) -> Forest {
        build_forest(&*self.store.read().await)
    }

    pub async fn validate(&self) -> ValidationReport {
        self.validate_with(&Validator::new()).await
    }

    pub async fn validate_with(&self, validator: &Validator) -> ValidationReport {
        validator.run(&*self.store.read().await)
    }

    pub async fn stats(&self) -> GraphStats {
        self.store.read().await.stats()
    }

    pub async fn compute_layout(&self, sizes: &HashMap<String, NodeSize>) -> LayoutResult {
        self.layout.compute(&*self.store.read().await, sizes)
    }

    pub async fn crossing_count(&self) -> usize {
        self.layout.crossing_count(&*self.store.read().await)
    }

    /// Computes a layout and moves every node whose position changes, as one
    /// undoable step.
    pub async fn apply_layout(&self, sizes: &HashMap<String, NodeSize>) -> EditorResult<LayoutResult> {
        let (result, command) = {
            let store = self.store.read().await;
            let result = self.layout.compute(&store, sizes);
            let moved: Vec<NodePosition> = result
                .node_positions()
                .into_iter()
                .filter(|p| store.get(&p.id).and_then(|n| n.position) != Some(p.position()))
                .collect();
            let command = if moved.is_empty() {
                None
            } else {
                Some(SetPositions::new(&store, moved)?)
            };
            (result, command)
        };

        match command {
            Some(command) => {
                self.run(Box::new(command)).await?;
                info!(nodes = result.positions.len(), crossings = result.crossings, "Layout applied");
            }
            None => info!("Layout unchanged"),
        }
        Ok(result)
    }

    /// Nodes currently locked by anyone.
    pub async fn lock_states(&self) -> EditorResult<HashMap<String, LockState>> {
        Ok(self.locks.states().await?)
    }
}
