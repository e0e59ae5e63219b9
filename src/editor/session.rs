use serde::Serialize;
use tracing::debug;

use crate::errors::LockError;
use crate::locks::{AcquireOutcome, LockHandle};

/// How a node was opened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EditMode {
    Editing,
    /// Another editor holds the node
    ReadOnly { holder: String },
    /// The claim failed; the node can be viewed and opened again later
    Unclaimed { reason: String },
}

impl From<AcquireOutcome> for EditMode {
    fn from(outcome: AcquireOutcome) -> Self {
        match outcome {
            AcquireOutcome::Acquired => EditMode::Editing,
            AcquireOutcome::ReadOnly { holder } => EditMode::ReadOnly { holder },
            AcquireOutcome::Failed { reason } => EditMode::Unclaimed { reason },
        }
    }
}

/// A node opened in the editor. Dropping an editing session releases its
/// lock without waiting.
pub struct NodeSession {
    node_id: String,
    mode: EditMode,
    locks: LockHandle,
    closed: bool,
}

impl NodeSession {
    pub(crate) fn new(node_id: String, mode: EditMode, locks: LockHandle) -> Self {
        Self {
            node_id,
            mode,
            locks,
            closed: false,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn mode(&self) -> &EditMode {
        &self.mode
    }

    pub fn is_editable(&self) -> bool {
        self.mode == EditMode::Editing
    }

    /// Closes the node, releasing the lock if this session holds it.
    pub async fn close(mut self) -> Result<(), LockError> {
        self.closed = true;
        if self.is_editable() {
            self.locks.release(&self.node_id).await?;
        }
        Ok(())
    }
}

impl Drop for NodeSession {
    fn drop(&mut self) {
        if !self.closed && self.is_editable() && !self.locks.try_release(&self.node_id) {
            debug!(node_id = %self.node_id, "Lock release on drop not delivered");
        }
    }
}
