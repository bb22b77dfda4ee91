//! TTL read cache over a `StateStore`
//!
//! Loads served from memory while fresh; every save writes through to the
//! backend and refreshes the cached copy, so a reader behind this wrapper
//! never sees state older than the last write through the same wrapper.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use contracts::{PrincipalId, PrincipalState, StateStore, StoreError};
use tokio::time::Instant;
use tracing::trace;

struct CacheEntry {
    state: PrincipalState,
    fetched_at: Instant,
}

/// TTL read cache in front of any `StateStore`
///
/// `Sync` is required of the backend: the wrapper is shared across
/// worker tasks and its futures must stay `Send`.
pub struct CachedStore<S: StateStore + Sync> {
    inner: S,
    ttl: Duration,
    entries: Mutex<HashMap<PrincipalId, CacheEntry>>,
}

impl<S: StateStore + Sync> CachedStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Drop the cached copy for one principal
    pub fn invalidate(&self, principal: PrincipalId) {
        self.entries.lock().unwrap().remove(&principal);
    }

    fn cached(&self, principal: PrincipalId) -> Option<PrincipalState> {
        let entries = self.entries.lock().unwrap();
        let entry = entries.get(&principal)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.state.clone())
        } else {
            None
        }
    }

    fn store_entry(&self, principal: PrincipalId, state: &PrincipalState) {
        self.entries.lock().unwrap().insert(
            principal,
            CacheEntry {
                state: state.clone(),
                fetched_at: Instant::now(),
            },
        );
    }
}

impl<S: StateStore + Sync> StateStore for CachedStore<S> {
    async fn load(&self, principal: PrincipalId) -> Result<PrincipalState, StoreError> {
        if let Some(state) = self.cached(principal) {
            trace!(principal, "cache hit");
            return Ok(state);
        }

        let state = self.inner.load(principal).await?;
        self.store_entry(principal, &state);
        Ok(state)
    }

    async fn save(
        &self,
        principal: PrincipalId,
        state: &PrincipalState,
    ) -> Result<(), StoreError> {
        self.inner.save(principal, state).await?;
        self.store_entry(principal, state);
        Ok(())
    }

    async fn principal_ids(&self) -> Result<Vec<PrincipalId>, StoreError> {
        self.inner.principal_ids().await
    }
}
