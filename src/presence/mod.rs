//! Presence transport used by the lock coordinator.
//!
//! The transport is an unordered, at-least-once pub/sub channel. Consumers
//! must tolerate duplicates and reordering; [`crate::locks`] does.

mod broadcaster;
mod local;

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::errors::LockError;
use crate::model::Lock;

pub use broadcaster::TopicBroadcaster;
pub use local::LocalPresenceChannel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceEventKind {
    /// Holder claims (or re-asserts) a node
    Claimed,
    /// Holder gave the node up
    Released,
    /// Holder renews its lease
    Heartbeat,
    /// Holder left; all of its claims are void
    Departed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// Empty for [`PresenceEventKind::Departed`]
    pub node_id: String,
    pub holder: String,
    pub event: PresenceEventKind,
    /// Time of the original claim, carried by claims and heartbeats
    pub acquired_at: DateTime<Utc>,
    /// Lease length granted from receipt
    pub lease_ms: u64,
}

impl PresenceEvent {
    pub fn claimed(lock: &Lock, lease_ms: u64) -> Self {
        Self::for_lock(lock, PresenceEventKind::Claimed, lease_ms)
    }

    pub fn heartbeat(lock: &Lock, lease_ms: u64) -> Self {
        Self::for_lock(lock, PresenceEventKind::Heartbeat, lease_ms)
    }

    pub fn released(lock: &Lock) -> Self {
        Self::for_lock(lock, PresenceEventKind::Released, 0)
    }

    pub fn departed(holder: impl Into<String>) -> Self {
        Self {
            node_id: String::new(),
            holder: holder.into(),
            event: PresenceEventKind::Departed,
            acquired_at: Utc::now(),
            lease_ms: 0,
        }
    }

    fn for_lock(lock: &Lock, event: PresenceEventKind, lease_ms: u64) -> Self {
        Self {
            node_id: lock.node_id.clone(),
            holder: lock.holder.clone(),
            event,
            acquired_at: lock.acquired_at,
            lease_ms,
        }
    }
}

pub type PresenceStream = Pin<Box<dyn Stream<Item = PresenceEvent> + Send>>;

/// Pub/sub transport for presence events.
#[async_trait]
pub trait PresenceChannel: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<PresenceStream, LockError>;

    async fn publish(&self, topic: &str, event: PresenceEvent) -> Result<(), LockError>;
}
