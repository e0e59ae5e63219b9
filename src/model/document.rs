use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::node::Node;

/// Serialized form of a whole script, shared by exports and snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptDocument {
    pub nodes: Vec<Node>,
    pub exported_at: DateTime<Utc>,
}

impl ScriptDocument {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            exported_at: Utc::now(),
        }
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.responses.len()).sum()
    }
}
