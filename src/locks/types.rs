use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, oneshot};

use crate::errors::LockError;

/// Edit rights on one node as seen by this editor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LockState {
    Unlocked,
    LockedByMe,
    LockedByOther { holder: String },
}

impl LockState {
    pub fn is_mine(&self) -> bool {
        matches!(self, LockState::LockedByMe)
    }

    pub fn other_holder(&self) -> Option<&str> {
        match self {
            LockState::LockedByOther { holder } => Some(holder),
            _ => None,
        }
    }
}

/// Result of opening a node for edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AcquireOutcome {
    Acquired,
    /// Someone else holds the node; open it read-only
    ReadOnly { holder: String },
    /// The claim could not be published, timed out or was cancelled
    Failed { reason: String },
}

impl AcquireOutcome {
    pub fn is_acquired(&self) -> bool {
        matches!(self, AcquireOutcome::Acquired)
    }
}

/// Notification sent whenever a node's [`LockState`] changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LockStateChange {
    pub node_id: String,
    pub state: LockState,
}

/// Timing and identity of one editor's coordinator.
#[derive(Clone, Debug)]
pub struct LockSettings {
    pub holder: String,
    pub topic: String,
    /// How long a claim stays valid without a heartbeat
    pub lease_ttl: Duration,
    /// Must be shorter than `lease_ttl`
    pub heartbeat_interval: Duration,
    /// Wait for competing claims before an acquisition resolves
    pub settle_window: Duration,
    /// Upper bound for an acquisition, settle window included
    pub acquire_timeout: Duration,
}

impl LockSettings {
    pub fn new(holder: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            holder: holder.into(),
            topic: topic.into(),
            lease_ttl: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(10),
            settle_window: Duration::from_millis(250),
            acquire_timeout: Duration::from_secs(5),
        }
    }

    pub(crate) fn lease_ms(&self) -> u64 {
        u64::try_from(self.lease_ttl.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Commands handled by the coordinator task
pub(crate) enum LockCommand {
    Acquire {
        node_id: String,
        response: oneshot::Sender<AcquireOutcome>,
    },
    Release {
        node_id: String,
        response: Option<oneshot::Sender<Result<(), LockError>>>,
    },
    ReleaseAll {
        response: oneshot::Sender<Result<(), LockError>>,
    },
    State {
        node_id: String,
        response: oneshot::Sender<LockState>,
    },
    States {
        response: oneshot::Sender<HashMap<String, LockState>>,
    },
    Subscribe {
        response: oneshot::Sender<broadcast::Receiver<LockStateChange>>,
    },
    /// Sent by the settle timer of a pending claim
    Settle {
        node_id: String,
        acquired_at: chrono::DateTime<chrono::Utc>,
    },
    Shutdown {
        response: oneshot::Sender<()>,
    },
}
