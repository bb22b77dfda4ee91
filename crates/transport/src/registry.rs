//! Process-wide per-principal registries
//!
//! Two keyed maps guarded by accessor methods: live transport sessions
//! and running worker task handles. The maps are never exposed raw.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use contracts::PrincipalId;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::Transport;

/// Live transport sessions keyed by principal
pub struct TransportRegistry<T: Transport> {
    sessions: Mutex<HashMap<PrincipalId, Arc<T>>>,
}

impl<T: Transport> TransportRegistry<T> {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Register a session, replacing any existing one for the principal
    pub fn insert(&self, principal: PrincipalId, transport: Arc<T>) {
        self.sessions.lock().unwrap().insert(principal, transport);
    }

    /// Session for a principal, if one is registered
    pub fn get(&self, principal: PrincipalId) -> Option<Arc<T>> {
        self.sessions.lock().unwrap().get(&principal).cloned()
    }

    /// Remove and return the session for a principal
    pub fn remove(&self, principal: PrincipalId) -> Option<Arc<T>> {
        self.sessions.lock().unwrap().remove(&principal)
    }

    pub fn contains(&self, principal: PrincipalId) -> bool {
        self.sessions.lock().unwrap().contains_key(&principal)
    }

    /// Principals with a registered session
    pub fn principal_ids(&self) -> Vec<PrincipalId> {
        self.sessions.lock().unwrap().keys().copied().collect()
    }
}

impl<T: Transport> Default for TransportRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Running dispatch-worker task handles keyed by principal
///
/// A finished handle counts as absent: queries prune handles whose task
/// has already exited, so a worker that returned on its own needs no
/// explicit deregistration.
pub struct WorkerRegistry {
    workers: Mutex<HashMap<PrincipalId, JoinHandle<()>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a worker handle, aborting any previous one for the
    /// principal (at most one live worker per principal)
    pub fn insert(&self, principal: PrincipalId, handle: JoinHandle<()>) {
        if let Some(previous) = self.workers.lock().unwrap().insert(principal, handle) {
            if !previous.is_finished() {
                debug!(principal, "aborting superseded worker");
                previous.abort();
            }
        }
    }

    /// Abort and remove the worker for a principal, if one is running
    pub fn abort(&self, principal: PrincipalId) -> bool {
        match self.workers.lock().unwrap().remove(&principal) {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                was_running
            }
            None => false,
        }
    }

    /// Worker task currently running for a principal
    pub fn is_running(&self, principal: PrincipalId) -> bool {
        let mut workers = self.workers.lock().unwrap();
        match workers.get(&principal) {
            Some(handle) if handle.is_finished() => {
                workers.remove(&principal);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Principals with a running worker (finished handles pruned)
    pub fn running_ids(&self) -> Vec<PrincipalId> {
        let mut workers = self.workers.lock().unwrap();
        workers.retain(|_, handle| !handle.is_finished());
        workers.keys().copied().collect()
    }

    /// Abort every registered worker
    pub fn abort_all(&self) {
        let mut workers = self.workers.lock().unwrap();
        for (principal, handle) in workers.drain() {
            if !handle.is_finished() {
                debug!(principal, "aborting worker on shutdown");
                handle.abort();
            }
        }
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
