//! In-memory principal store
//!
//! Records are kept as raw JSON values and reconciled against the current
//! schema on every load: missing fields come back as defaults, unknown
//! fields are dropped. This mirrors what a file- or database-backed
//! implementation does with records written by older builds.

use std::collections::HashMap;
use std::sync::Mutex;

use contracts::{PrincipalId, PrincipalState, StateStore, StoreError};
use tracing::debug;

/// In-memory JSON-value store
pub struct MemoryStore {
    records: Mutex<HashMap<PrincipalId, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Seed a raw JSON record, bypassing the schema. Test hook for
    /// records written by older builds.
    pub fn seed_raw(&self, principal: PrincipalId, value: serde_json::Value) {
        self.records.lock().unwrap().insert(principal, value);
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for MemoryStore {
    async fn load(&self, principal: PrincipalId) -> Result<PrincipalState, StoreError> {
        let raw = self.records.lock().unwrap().get(&principal).cloned();
        match raw {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| StoreError::codec(format!("record for {principal}: {e}"))),
            None => {
                debug!(principal, "no stored record, returning defaults");
                Ok(PrincipalState::default())
            }
        }
    }

    async fn save(
        &self,
        principal: PrincipalId,
        state: &PrincipalState,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(state)
            .map_err(|e| StoreError::codec(format!("record for {principal}: {e}")))?;
        self.records.lock().unwrap().insert(principal, value);
        Ok(())
    }

    async fn principal_ids(&self) -> Result<Vec<PrincipalId>, StoreError> {
        Ok(self.records.lock().unwrap().keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ModeState;
    use serde_json::json;

    #[tokio::test]
    async fn test_load_absent_returns_defaults() {
        let store = MemoryStore::new();
        let state = store.load(1).await.unwrap();
        assert_eq!(state, PrincipalState::default());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let store = MemoryStore::new();
        let mut state = PrincipalState::default();
        state.registered = true;
        state.targets.push("@grp".into());
        state.forwarding = ModeState::ActiveForever;

        store.save(9, &state).await.unwrap();
        let loaded = store.load(9).await.unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_legacy_record_reconciled() {
        let store = MemoryStore::new();
        store.seed_raw(
            5,
            json!({
                "registered": true,
                "dropped_in_v2": {"nested": true}
            }),
        );

        let state = store.load(5).await.unwrap();
        assert!(state.registered);
        assert_eq!(state.pacing_secs, 120);

        // A save rewrites the record in the current schema
        store.save(5, &state).await.unwrap();
        let raw = store.records.lock().unwrap().get(&5).cloned().unwrap();
        assert!(raw.get("dropped_in_v2").is_none());
        assert!(raw.get("pacing_secs").is_some());
    }

    #[tokio::test]
    async fn test_principal_ids_lists_stored_records() {
        let store = MemoryStore::new();
        store.save(1, &PrincipalState::default()).await.unwrap();
        store.save(2, &PrincipalState::default()).await.unwrap();

        let mut ids = store.principal_ids().await.unwrap();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }
}
