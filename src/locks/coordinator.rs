use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{AcquireOutcome, LockCommand, LockSettings, LockState, LockStateChange};
use crate::errors::LockError;
use crate::model::Lock;
use crate::presence::{PresenceChannel, PresenceEvent, PresenceEventKind, PresenceStream};

struct OwnClaim {
    lock: Lock,
    settled: bool,
    waiters: Vec<oneshot::Sender<AcquireOutcome>>,
}

/// Marks claims up to `acquired_at` as stale, kept for one lease TTL.
struct Tombstone {
    acquired_at: DateTime<Utc>,
    recorded: Instant,
}

struct ForeignClaim {
    lock: Lock,
    deadline: Instant,
}

/// Lock state for one editor, run as a single actor task.
pub struct LockCoordinator {
    settings: LockSettings,
    channel: Arc<dyn PresenceChannel>,
    command_rx: mpsc::Receiver<LockCommand>,
    timer_tx: mpsc::WeakSender<LockCommand>,
    own: HashMap<String, OwnClaim>,
    foreign: HashMap<String, HashMap<String, ForeignClaim>>,
    /// Latest `acquired_at` released per (node, holder); older claims are stale
    released: HashMap<(String, String), Tombstone>,
    departed: HashMap<String, Tombstone>,
    published: HashMap<String, LockState>,
    changes: broadcast::Sender<LockStateChange>,
    shutdown_reply: Option<oneshot::Sender<()>>,
}

impl LockCoordinator {
    /// Subscribes to the presence topic and starts the coordinator task.
    pub async fn spawn(
        settings: LockSettings,
        channel: Arc<dyn PresenceChannel>,
    ) -> Result<LockHandle, LockError> {
        let events = channel.subscribe(&settings.topic).await?;
        let (tx, rx) = mpsc::channel(256);
        let handle = LockHandle {
            command_tx: tx.clone(),
            holder: settings.holder.clone(),
            acquire_timeout: settings.acquire_timeout,
        };
        let coordinator = Self::new(settings, channel, rx, tx.downgrade());

        info!(
            holder = %coordinator.settings.holder,
            topic = %coordinator.settings.topic,
            "LockCoordinator spawned"
        );
        tokio::spawn(coordinator.run(events));
        Ok(handle)
    }

    fn new(
        settings: LockSettings,
        channel: Arc<dyn PresenceChannel>,
        command_rx: mpsc::Receiver<LockCommand>,
        timer_tx: mpsc::WeakSender<LockCommand>,
    ) -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            settings,
            channel,
            command_rx,
            timer_tx,
            own: HashMap::new(),
            foreign: HashMap::new(),
            released: HashMap::new(),
            departed: HashMap::new(),
            published: HashMap::new(),
            changes,
            shutdown_reply: None,
        }
    }

    async fn run(mut self, mut events: PresenceStream) {
        let mut heartbeat = tokio::time::interval(self.settings.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stream_open = true;

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd).await {
                        break;
                    }
                }
                event = events.next(), if stream_open => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        warn!("Presence stream closed; foreign locks will lapse");
                        stream_open = false;
                    }
                },
                _ = heartbeat.tick() => self.on_tick().await,
            }
        }

        self.depart().await;
        if let Some(reply) = self.shutdown_reply.take() {
            let _ = reply.send(());
        }
        info!(holder = %self.settings.holder, "LockCoordinator event loop ended");
    }

    /// Returns false when the loop should stop.
    async fn handle_command(&mut self, cmd: LockCommand) -> bool {
        match cmd {
            LockCommand::Acquire { node_id, response } => self.acquire(node_id, response).await,
            LockCommand::Settle {
                node_id,
                acquired_at,
            } => self.settle(&node_id, acquired_at).await,
            LockCommand::Release { node_id, response } => {
                let result = self.release(&node_id).await;
                if let Some(response) = response {
                    let _ = response.send(result);
                }
            }
            LockCommand::ReleaseAll { response } => {
                let nodes: Vec<String> = self.own.keys().cloned().collect();
                let mut result = Ok(());
                for node_id in nodes {
                    if let Err(err) = self.release(&node_id).await {
                        result = Err(err);
                    }
                }
                let _ = response.send(result);
            }
            LockCommand::State { node_id, response } => {
                let _ = response.send(self.state_of(&node_id));
            }
            LockCommand::States { response } => {
                let nodes: HashSet<&String> = self.own.keys().chain(self.foreign.keys()).collect();
                let states = nodes
                    .into_iter()
                    .map(|id| (id.clone(), self.state_of(id)))
                    .filter(|(_, state)| *state != LockState::Unlocked)
                    .collect();
                let _ = response.send(states);
            }
            LockCommand::Subscribe { response } => {
                let _ = response.send(self.changes.subscribe());
            }
            LockCommand::Shutdown { response } => {
                info!(
                    "LockCoordinator shutting down with {} held locks",
                    self.own.len()
                );
                self.shutdown_reply = Some(response);
                return false;
            }
        }
        true
    }

    async fn acquire(&mut self, node_id: String, response: oneshot::Sender<AcquireOutcome>) {
        if let Some(claim) = self.own.get_mut(&node_id) {
            if claim.settled {
                let _ = response.send(AcquireOutcome::Acquired);
            } else {
                claim.waiters.push(response);
            }
            return;
        }

        if let Some(other) = self.best_foreign(&node_id) {
            debug!(node_id = %node_id, holder = %other.holder, "Node held elsewhere");
            let _ = response.send(AcquireOutcome::ReadOnly {
                holder: other.holder.clone(),
            });
            return;
        }

        let lock = Lock::new(
            node_id.clone(),
            self.settings.holder.clone(),
            to_chrono(self.settings.lease_ttl),
        );
        let event = PresenceEvent::claimed(&lock, self.settings.lease_ms());
        if let Err(err) = self.channel.publish(&self.settings.topic, event).await {
            warn!(node_id = %node_id, "Failed to publish claim: {}", err);
            let _ = response.send(AcquireOutcome::Failed {
                reason: err.to_string(),
            });
            return;
        }

        debug!(node_id = %node_id, "Claim published, settling");
        let acquired_at = lock.acquired_at;
        self.own.insert(
            node_id.clone(),
            OwnClaim {
                lock,
                settled: false,
                waiters: vec![response],
            },
        );

        let timer_tx = self.timer_tx.clone();
        let window = self.settings.settle_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(tx) = timer_tx.upgrade() {
                let _ = tx
                    .send(LockCommand::Settle {
                        node_id,
                        acquired_at,
                    })
                    .await;
            }
        });
    }

    async fn settle(&mut self, node_id: &str, acquired_at: DateTime<Utc>) {
        let Some(claim) = self.own.get(node_id) else {
            return;
        };
        if claim.settled || claim.lock.acquired_at != acquired_at {
            return;
        }

        let winner = self
            .best_foreign(node_id)
            .filter(|other| other.precedes(&claim.lock))
            .map(|other| other.holder.clone());

        match winner {
            Some(holder) => {
                info!(node_id, winner = %holder, "Lost competing claim");
                if let Some(claim) = self.own.remove(node_id) {
                    self.publish(PresenceEvent::released(&claim.lock)).await;
                    for waiter in claim.waiters {
                        let _ = waiter.send(AcquireOutcome::ReadOnly {
                            holder: holder.clone(),
                        });
                    }
                }
            }
            None => {
                if let Some(claim) = self.own.get_mut(node_id) {
                    claim.settled = true;
                    for waiter in claim.waiters.drain(..) {
                        let _ = waiter.send(AcquireOutcome::Acquired);
                    }
                }
                info!(node_id, "Lock acquired");
            }
        }
        self.refresh(node_id);
    }

    async fn release(&mut self, node_id: &str) -> Result<(), LockError> {
        let Some(claim) = self.own.remove(node_id) else {
            return Ok(());
        };
        for waiter in claim.waiters {
            let _ = waiter.send(AcquireOutcome::Failed {
                reason: "released before settling".to_string(),
            });
        }
        self.refresh(node_id);
        debug!(node_id, "Lock released");
        self.channel
            .publish(&self.settings.topic, PresenceEvent::released(&claim.lock))
            .await
    }

    async fn handle_event(&mut self, event: PresenceEvent) {
        if event.holder == self.settings.holder {
            return;
        }
        debug!(
            node_id = %event.node_id,
            holder = %event.holder,
            event = ?event.event,
            "Presence event"
        );

        match event.event {
            PresenceEventKind::Claimed | PresenceEventKind::Heartbeat => {
                self.on_foreign_claim(event).await
            }
            PresenceEventKind::Released => {
                let key = (event.node_id.clone(), event.holder.clone());
                let newest = self
                    .released
                    .get(&key)
                    .map_or(event.acquired_at, |prev| prev.acquired_at.max(event.acquired_at));
                self.released.insert(
                    key,
                    Tombstone {
                        acquired_at: newest,
                        recorded: Instant::now(),
                    },
                );

                if let Some(claims) = self.foreign.get_mut(&event.node_id) {
                    if claims
                        .get(&event.holder)
                        .is_some_and(|c| c.lock.acquired_at <= event.acquired_at)
                    {
                        claims.remove(&event.holder);
                    }
                    if claims.is_empty() {
                        self.foreign.remove(&event.node_id);
                    }
                }
                self.refresh(&event.node_id);
            }
            PresenceEventKind::Departed => {
                info!(holder = %event.holder, "Editor departed");
                self.departed.insert(
                    event.holder.clone(),
                    Tombstone {
                        acquired_at: event.acquired_at,
                        recorded: Instant::now(),
                    },
                );
                let mut touched = Vec::new();
                self.foreign.retain(|node_id, claims| {
                    if claims.remove(&event.holder).is_some() {
                        touched.push(node_id.clone());
                    }
                    !claims.is_empty()
                });
                for node_id in touched {
                    self.refresh(&node_id);
                }
            }
        }
    }

    async fn on_foreign_claim(&mut self, event: PresenceEvent) {
        if self.is_stale(&event) {
            debug!(node_id = %event.node_id, holder = %event.holder, "Ignoring stale claim");
            return;
        }

        let lease = Duration::from_millis(event.lease_ms);
        let lock = Lock {
            node_id: event.node_id.clone(),
            holder: event.holder.clone(),
            acquired_at: event.acquired_at,
            expires_at: Utc::now() + to_chrono(lease),
        };
        self.foreign.entry(event.node_id.clone()).or_default().insert(
            event.holder.clone(),
            ForeignClaim {
                lock: lock.clone(),
                deadline: Instant::now() + lease,
            },
        );

        let mut reassert = None;
        let mut yielded = false;
        if let Some(claim) = self.own.get(&event.node_id) {
            if claim.lock.precedes(&lock) {
                reassert = Some(PresenceEvent::claimed(&claim.lock, self.settings.lease_ms()));
            } else if claim.settled {
                yielded = true;
            }
        }

        if let Some(reassert) = reassert {
            debug!(node_id = %event.node_id, newcomer = %event.holder, "Re-asserting claim");
            self.publish(reassert).await;
        }
        if yielded {
            warn!(
                node_id = %event.node_id,
                holder = %event.holder,
                "Earlier claim arrived late; yielding lock"
            );
            self.own.remove(&event.node_id);
        }
        self.refresh(&event.node_id);
    }

    fn is_stale(&self, event: &PresenceEvent) -> bool {
        let key = (event.node_id.clone(), event.holder.clone());
        let released = self
            .released
            .get(&key)
            .is_some_and(|t| event.acquired_at <= t.acquired_at);
        let departed = self
            .departed
            .get(&event.holder)
            .is_some_and(|t| event.acquired_at <= t.acquired_at);
        released || departed
    }

    async fn on_tick(&mut self) {
        let lease_ms = self.settings.lease_ms();
        let beats: Vec<PresenceEvent> = self
            .own
            .values()
            .filter(|claim| claim.settled)
            .map(|claim| PresenceEvent::heartbeat(&claim.lock, lease_ms))
            .collect();
        for beat in beats {
            self.publish(beat).await;
        }

        let now = Instant::now();
        let mut expired = Vec::new();
        self.foreign.retain(|node_id, claims| {
            claims.retain(|holder, claim| {
                let alive = claim.deadline > now;
                if !alive {
                    info!(node_id = %node_id, holder = %holder, "Foreign lock lease expired");
                }
                alive
            });
            if claims.is_empty() {
                expired.push(node_id.clone());
                false
            } else {
                true
            }
        });
        for node_id in expired {
            self.refresh(&node_id);
        }
        self.prune_tombstones(now);
    }

    /// Claims delayed longer than a lease are not expected any more.
    fn prune_tombstones(&mut self, now: Instant) {
        let ttl = self.settings.lease_ttl;
        self.released.retain(|_, t| t.recorded + ttl > now);
        self.departed.retain(|_, t| t.recorded + ttl > now);
    }

    async fn depart(&mut self) {
        for (_, claim) in self.own.drain() {
            for waiter in claim.waiters {
                let _ = waiter.send(AcquireOutcome::Failed {
                    reason: "coordinator stopped".to_string(),
                });
            }
        }
        let departed = PresenceEvent::departed(self.settings.holder.clone());
        self.publish(departed).await;
    }

    async fn publish(&self, event: PresenceEvent) {
        if let Err(err) = self.channel.publish(&self.settings.topic, event).await {
            warn!("Failed to publish presence event: {}", err);
        }
    }

    fn best_foreign(&self, node_id: &str) -> Option<&Lock> {
        let now = Instant::now();
        self.foreign
            .get(node_id)?
            .values()
            .filter(|claim| claim.deadline > now)
            .map(|claim| &claim.lock)
            .min_by(|a, b| (a.acquired_at, &a.holder).cmp(&(b.acquired_at, &b.holder)))
    }

    fn state_of(&self, node_id: &str) -> LockState {
        if self.own.get(node_id).is_some_and(|claim| claim.settled) {
            return LockState::LockedByMe;
        }
        match self.best_foreign(node_id) {
            Some(lock) => LockState::LockedByOther {
                holder: lock.holder.clone(),
            },
            None => LockState::Unlocked,
        }
    }

    /// Notifies subscribers if the node's state differs from the last one sent.
    fn refresh(&mut self, node_id: &str) {
        let state = self.state_of(node_id);
        let previous = self
            .published
            .get(node_id)
            .cloned()
            .unwrap_or(LockState::Unlocked);
        if previous == state {
            return;
        }
        if state == LockState::Unlocked {
            self.published.remove(node_id);
        } else {
            self.published.insert(node_id.to_string(), state.clone());
        }
        let _ = self.changes.send(LockStateChange {
            node_id: node_id.to_string(),
            state,
        });
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::weeks(52))
}

/// Handle to send commands to the LockCoordinator
#[derive(Clone)]
pub struct LockHandle {
    command_tx: mpsc::Sender<LockCommand>,
    holder: String,
    acquire_timeout: Duration,
}

impl LockHandle {
    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Claims a node. A claim that does not settle within the acquire
    /// timeout is withdrawn and reported as failed.
    pub async fn acquire(&self, node_id: &str) -> AcquireOutcome {
        self.acquire_with(node_id, &CancellationToken::new()).await
    }

    pub async fn acquire_with(&self, node_id: &str, cancel: &CancellationToken) -> AcquireOutcome {
        let (tx, rx) = oneshot::channel();
        let sent = self
            .command_tx
            .send(LockCommand::Acquire {
                node_id: node_id.to_string(),
                response: tx,
            })
            .await;
        if sent.is_err() {
            return AcquireOutcome::Failed {
                reason: LockError::CoordinatorUnavailable.to_string(),
            };
        }

        let reason = tokio::select! {
            outcome = rx => match outcome {
                Ok(outcome) => return outcome,
                Err(_) => LockError::ResponseDropped.to_string(),
            },
            _ = tokio::time::sleep(self.acquire_timeout) => "claim timed out".to_string(),
            _ = cancel.cancelled() => "claim cancelled".to_string(),
        };

        warn!(node_id, "Lock acquisition failed: {}", reason);
        if let Err(err) = self.release(node_id).await {
            debug!(node_id, "Withdrawing failed claim: {}", err);
        }
        AcquireOutcome::Failed { reason }
    }

    pub async fn release(&self, node_id: &str) -> Result<(), LockError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LockCommand::Release {
                node_id: node_id.to_string(),
                response: Some(tx),
            })
            .await
            .map_err(|_| LockError::CoordinatorUnavailable)?;
        rx.await.map_err(|_| LockError::ResponseDropped)?
    }

    /// Fire-and-forget release for use from `Drop`.
    pub fn try_release(&self, node_id: &str) -> bool {
        self.command_tx
            .try_send(LockCommand::Release {
                node_id: node_id.to_string(),
                response: None,
            })
            .is_ok()
    }

    pub async fn release_all(&self) -> Result<(), LockError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LockCommand::ReleaseAll { response: tx })
            .await
            .map_err(|_| LockError::CoordinatorUnavailable)?;
        rx.await.map_err(|_| LockError::ResponseDropped)?
    }

    pub async fn state(&self, node_id: &str) -> Result<LockState, LockError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LockCommand::State {
                node_id: node_id.to_string(),
                response: tx,
            })
            .await
            .map_err(|_| LockError::CoordinatorUnavailable)?;
        rx.await.map_err(|_| LockError::ResponseDropped)
    }

    /// Every node that is not unlocked.
    pub async fn states(&self) -> Result<HashMap<String, LockState>, LockError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LockCommand::States { response: tx })
            .await
            .map_err(|_| LockError::CoordinatorUnavailable)?;
        rx.await.map_err(|_| LockError::ResponseDropped)
    }

    pub async fn holder_of(&self, node_id: &str) -> Result<Option<String>, LockError> {
        Ok(match self.state(node_id).await? {
            LockState::Unlocked => None,
            LockState::LockedByMe => Some(self.holder.clone()),
            LockState::LockedByOther { holder } => Some(holder),
        })
    }

    pub async fn subscribe_changes(
        &self,
    ) -> Result<broadcast::Receiver<LockStateChange>, LockError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LockCommand::Subscribe { response: tx })
            .await
            .map_err(|_| LockError::CoordinatorUnavailable)?;
        rx.await.map_err(|_| LockError::ResponseDropped)
    }

    /// Releases everything, announces departure and stops the task.
    pub async fn shutdown(&self) -> Result<(), LockError> {
        let (tx, rx) = oneshot::channel();
        self.command_tx
            .send(LockCommand::Shutdown { response: tx })
            .await
            .map_err(|_| LockError::CoordinatorUnavailable)?;
        rx.await.map_err(|_| LockError::ResponseDropped)
    }
}
