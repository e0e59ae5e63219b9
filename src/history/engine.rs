use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::command::{Command, CommandContext};
use crate::errors::{HistoryError, HistoryResult};
use crate::graph_store::GraphStore;
use crate::store::RemoteStore;

#[derive(Default)]
struct Stacks {
    past: VecDeque<Box<dyn Command>>,
    future: Vec<Box<dyn Command>>,
}

/// Ids of nodes with a command in flight, released when dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    ids: Vec<String>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut set = lock(self.set);
        for id in &self.ids {
            set.remove(id);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Undo/redo stacks over commands that persist through a [`RemoteStore`].
///
/// Commands on disjoint nodes may run concurrently; a command touching a
/// node that already has one in flight is rejected with
/// [`HistoryError::NodeBusy`]. A failed command never reaches the stacks.
pub struct HistoryEngine {
    store: Arc<RwLock<GraphStore>>,
    remote: Arc<dyn RemoteStore>,
    stacks: Mutex<Stacks>,
    in_flight: Mutex<HashSet<String>>,
    max_depth: usize,
}

impl HistoryEngine {
    pub fn new(
        store: Arc<RwLock<GraphStore>>,
        remote: Arc<dyn RemoteStore>,
        max_depth: usize,
    ) -> Self {
        Self {
            store,
            remote,
            stacks: Mutex::new(Stacks::default()),
            in_flight: Mutex::new(HashSet::new()),
            max_depth: max_depth.max(1),
        }
    }

    pub fn store(&self) -> &Arc<RwLock<GraphStore>> {
        &self.store
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    pub async fn execute(&self, command: Box<dyn Command>) -> HistoryResult<()> {
        self.execute_with(command, &CancellationToken::new()).await
    }

    /// Runs `command`; cancelling `cancel` before its remote call resolves
    /// aborts it uncommitted.
    pub async fn execute_with(
        &self,
        mut command: Box<dyn Command>,
        cancel: &CancellationToken,
    ) -> HistoryResult<()> {
        let name = command.name();
        let _guard = self.claim(command.node_ids())?;
        debug!(command = %name, "Executing");

        command.redo(&self.context(cancel)).await.map_err(|err| {
            warn!(command = %name, "Command failed: {}", err);
            err
        })?;

        let mut stacks = lock(&self.stacks);
        stacks.past.push_back(command);
        while stacks.past.len() > self.max_depth {
            stacks.past.pop_front();
        }
        stacks.future.clear();
        info!(command = %name, depth = stacks.past.len(), "Command committed");
        Ok(())
    }

    /// Reverts the most recent command and returns its label, or `None` when
    /// there is nothing to undo. On failure the command stays undoable.
    pub async fn undo(&self) -> HistoryResult<Option<String>> {
        let Some(mut command) = lock(&self.stacks).past.pop_back() else {
            return Ok(None);
        };
        let name = command.name();

        let guard = match self.claim(command.node_ids()) {
            Ok(guard) => guard,
            Err(err) => {
                lock(&self.stacks).past.push_back(command);
                return Err(err);
            }
        };

        let result = command.undo(&self.context(&CancellationToken::new())).await;
        drop(guard);
        let mut stacks = lock(&self.stacks);
        match result {
            Ok(()) => {
                stacks.future.push(command);
                info!(command = %name, "Undone");
                Ok(Some(name))
            }
            Err(err) => {
                warn!(command = %name, "Undo failed: {}", err);
                stacks.past.push_back(command);
                Err(err)
            }
        }
    }

    /// Re-applies the most recently undone command.
    pub async fn redo(&self) -> HistoryResult<Option<String>> {
        let Some(mut command) = lock(&self.stacks).future.pop() else {
            return Ok(None);
        };
        let name = command.name();

        let guard = match self.claim(command.node_ids()) {
            Ok(guard) => guard,
            Err(err) => {
                lock(&self.stacks).future.push(command);
                return Err(err);
            }
        };

        let result = command.redo(&self.context(&CancellationToken::new())).await;
        drop(guard);
        let mut stacks = lock(&self.stacks);
        match result {
            Ok(()) => {
                stacks.past.push_back(command);
                info!(command = %name, "Redone");
                Ok(Some(name))
            }
            Err(err) => {
                warn!(command = %name, "Redo failed: {}", err);
                stacks.future.push(command);
                Err(err)
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        !lock(&self.stacks).past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !lock(&self.stacks).future.is_empty()
    }

    pub fn undo_label(&self) -> Option<String> {
        lock(&self.stacks).past.back().map(|c| c.name())
    }

    pub fn redo_label(&self) -> Option<String> {
        lock(&self.stacks).future.last().map(|c| c.name())
    }

    /// Nodes the next `undo` would touch.
    pub fn undo_targets(&self) -> Option<Vec<String>> {
        lock(&self.stacks).past.back().map(|c| c.node_ids())
    }

    pub fn redo_targets(&self) -> Option<Vec<String>> {
        lock(&self.stacks).future.last().map(|c| c.node_ids())
    }

    pub fn depth(&self) -> (usize, usize) {
        let stacks = lock(&self.stacks);
        (stacks.past.len(), stacks.future.len())
    }

    /// Forgets all history, e.g. after the graph was replaced wholesale.
    pub fn clear(&self) {
        let mut stacks = lock(&self.stacks);
        stacks.past.clear();
        stacks.future.clear();
        debug!("History cleared");
    }

    pub fn is_busy(&self, node_id: &str) -> bool {
        lock(&self.in_flight).contains(node_id)
    }

    fn claim(&self, ids: Vec<String>) -> HistoryResult<InFlight<'_>> {
        let mut set = lock(&self.in_flight);
        if let Some(busy) = ids.iter().find(|id| set.contains(*id)) {
            return Err(HistoryError::NodeBusy(busy.clone()));
        }
        set.extend(ids.iter().cloned());
        Ok(InFlight {
            set: &self.in_flight,
            ids,
        })
    }

    fn context<'a>(&'a self, cancel: &'a CancellationToken) -> CommandContext<'a> {
        CommandContext {
            store: &self.store,
            remote: self.remote.as_ref(),
            cancel,
        }
    }
}
