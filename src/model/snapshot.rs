use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::ScriptDocument;

/// Immutable full-graph capture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub data: ScriptDocument,
}

impl Snapshot {
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            id: self.id.clone(),
            label: self.label.clone(),
            created_at: self.created_at,
            created_by: self.created_by.clone(),
            node_count: self.data.nodes.len(),
        }
    }
}

/// Listing entry for a snapshot, without its payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub node_count: usize,
}
