//! Confirmation tokens for destructive operations.
//!
//! A [`Confirmation`] can only be obtained from a preview (`plan_delete`,
//! `plan_import`, `plan_restore`), so a caller that overwrites data has seen
//! what it is about to lose.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Operation a confirmation was issued for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum ConfirmScope {
    DeleteNode(String),
    OverwriteImport,
    RestoreSnapshot(String),
}

impl fmt::Display for ConfirmScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmScope::DeleteNode(id) => write!(f, "delete node '{id}'"),
            ConfirmScope::OverwriteImport => f.write_str("overwrite import"),
            ConfirmScope::RestoreSnapshot(id) => write!(f, "restore snapshot '{id}'"),
        }
    }
}

/// How much of the graph a destructive operation touches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Impact {
    /// Nodes removed or replaced
    pub nodes: usize,
    /// Edges that are removed or start dangling
    pub edges: usize,
}

impl Impact {
    pub fn is_empty(&self) -> bool {
        self.nodes == 0 && self.edges == 0
    }
}

/// Proof that the caller previewed a destructive operation.
///
/// Each preview issues a token with its own id, so a confirmation only
/// unlocks the plan it came with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    id: String,
    scope: ConfirmScope,
    impact: Impact,
}

impl Confirmation {
    pub(crate) fn new(scope: ConfirmScope, impact: Impact) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            scope,
            impact,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scope(&self) -> &ConfirmScope {
        &self.scope
    }

    pub fn impact(&self) -> &Impact {
        &self.impact
    }

    pub fn matches(&self, scope: &ConfirmScope) -> bool {
        &self.scope == scope
    }

    /// Same operation with the same reported impact; the preview id may differ.
    pub fn covers(&self, required: &Confirmation) -> bool {
        self.scope == required.scope && self.impact == required.impact
    }
}
