//! Per-node edit locks negotiated over a presence channel.
//!
//! A claim is broadcast, then held open for a settle window; if a competing
//! claim arrives the earliest `(acquired_at, holder)` wins on every editor.
//! Holders heartbeat while they hold a node, and foreign claims that stop
//! heartbeating lapse after the lease TTL. Locks are advisory: they decide
//! which editor may originate commands for a node.

mod coordinator;
mod types;

pub use coordinator::{LockCoordinator, LockHandle};
pub use types::{AcquireOutcome, LockSettings, LockState, LockStateChange};
