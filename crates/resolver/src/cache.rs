//! Bounded TTL cache of resolved entities
//!
//! Capacity-bounded with oldest-insertion-first eviction. A stale entry
//! (older than the TTL) is a miss and is removed on access; re-inserting
//! an existing key refreshes its value and timestamp but keeps its place
//! in the eviction order.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use contracts::{Entity, TargetRef};
use tokio::time::Instant;
use tracing::trace;

struct CacheSlot {
    entity: Entity,
    inserted_at: Instant,
}

/// Bounded TTL entity cache
pub struct EntityCache {
    capacity: usize,
    ttl: Duration,
    slots: HashMap<TargetRef, CacheSlot>,
    /// Keys in insertion order; front is evicted first
    order: VecDeque<TargetRef>,
}

impl EntityCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            slots: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Fresh entry for a key, if one exists
    pub fn get(&mut self, key: &TargetRef) -> Option<Entity> {
        match self.slots.get(key) {
            Some(slot) if slot.inserted_at.elapsed() < self.ttl => Some(slot.entity.clone()),
            Some(_) => {
                trace!(target = %key, "stale cache entry dropped");
                self.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or refresh an entry, evicting the oldest insertion when at
    /// capacity
    pub fn insert(&mut self, key: TargetRef, entity: Entity) {
        let slot = CacheSlot {
            entity,
            inserted_at: Instant::now(),
        };

        if self.slots.insert(key.clone(), slot).is_some() {
            return;
        }
        self.order.push_back(key);

        while self.slots.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            trace!(target = %oldest, "evicting oldest cache entry");
            self.slots.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn remove(&mut self, key: &TargetRef) {
        self.slots.remove(key);
        self.order.retain(|k| k != key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::EntityKind;

    fn entity(peer_id: i64) -> Entity {
        Entity {
            peer_id,
            kind: EntityKind::Group,
            title: None,
            handle: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_within_ttl() {
        let mut cache = EntityCache::new(10, Duration::from_secs(300));
        cache.insert(TargetRef::Id(1), entity(1));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get(&TargetRef::Id(1)).unwrap().peer_id, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_is_miss_and_removed() {
        let mut cache = EntityCache::new(10, Duration::from_secs(300));
        cache.insert(TargetRef::Id(1), entity(1));

        tokio::time::advance(Duration::from_secs(300)).await;
        assert!(cache.get(&TargetRef::Id(1)).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_is_oldest_insertion_first() {
        let mut cache = EntityCache::new(3, Duration::from_secs(300));
        for id in 1..=3 {
            cache.insert(TargetRef::Id(id), entity(id));
        }
        // Refreshing key 1 must not save it from eviction
        cache.insert(TargetRef::Id(1), entity(100));

        cache.insert(TargetRef::Id(4), entity(4));
        assert_eq!(cache.len(), 3);
        assert!(cache.get(&TargetRef::Id(1)).is_none());
        assert!(cache.get(&TargetRef::Id(2)).is_some());
        assert!(cache.get(&TargetRef::Id(4)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_updates_value() {
        let mut cache = EntityCache::new(3, Duration::from_secs(300));
        cache.insert(TargetRef::Id(1), entity(1));
        cache.insert(TargetRef::Id(1), entity(99));
        assert_eq!(cache.get(&TargetRef::Id(1)).unwrap().peer_id, 99);
        assert_eq!(cache.len(), 1);
    }
}
