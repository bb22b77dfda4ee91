//! Target resolver
//!
//! Turns stored target identifiers into resolved group-like entities via
//! the transport, backed by the bounded TTL cache. One resolver per
//! principal: sessions are not interchangeable, so neither are their
//! resolution results.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{Entity, TargetRef, TransportError};
use metrics::counter;
use tracing::{debug, instrument};
use transport::Transport;

use crate::cache::EntityCache;
use crate::error::ResolutionError;

/// Per-principal target resolver
pub struct TargetResolver<T: Transport> {
    transport: Arc<T>,
    cache: Mutex<EntityCache>,
}

impl<T: Transport> TargetResolver<T> {
    pub fn new(transport: Arc<T>, cache_capacity: usize, cache_ttl: Duration) -> Self {
        Self {
            transport,
            cache: Mutex::new(EntityCache::new(cache_capacity, cache_ttl)),
        }
    }

    /// Resolve a stored identifier to a group-like entity
    ///
    /// Identifiers are normalized first (digit strings become numeric
    /// ids). A positive numeric id that comes back NotFound is retried
    /// once in its broadcast form (`-100` prefix) before giving up.
    /// Only group-like results are cached or returned.
    ///
    /// # Errors
    /// See `ResolutionError` for the failure taxonomy.
    #[instrument(name = "resolve_target", skip(self), fields(identifier = %identifier))]
    pub async fn resolve(&self, identifier: &str) -> Result<Entity, ResolutionError> {
        counter!("resolver_resolutions_total").increment(1);
        let target = TargetRef::normalize(identifier);

        if let Some(entity) = self.cache.lock().unwrap().get(&target) {
            counter!("resolver_cache_hits_total").increment(1);
            return Ok(entity);
        }
        counter!("resolver_cache_misses_total").increment(1);

        let entity = match self.transport.resolve_identity(&target).await {
            Ok(entity) => entity,
            Err(TransportError::NotFound { .. }) => {
                let Some(broadcast) = broadcast_form(&target) else {
                    return Err(ResolutionError::NotFound {
                        target: identifier.to_string(),
                    });
                };
                debug!(target = %target, retry = %broadcast, "retrying in broadcast form");
                self.transport
                    .resolve_identity(&broadcast)
                    .await
                    .map_err(|e| ResolutionError::from_transport(identifier, e))?
            }
            Err(e) => return Err(ResolutionError::from_transport(identifier, e)),
        };

        if !entity.is_group_like() {
            return Err(ResolutionError::NotGroupLike {
                target: identifier.to_string(),
            });
        }

        self.cache.lock().unwrap().insert(target, entity.clone());
        Ok(entity)
    }

    /// Entries currently cached
    pub fn cached_len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}

/// Broadcast form of a positive numeric id (`123` -> `-100123`)
fn broadcast_form(target: &TargetRef) -> Option<TargetRef> {
    match target {
        TargetRef::Id(id) if *id > 0 => format!("-100{id}").parse::<i64>().ok().map(TargetRef::Id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::EntityKind;
    use transport::MockTransport;

    fn entity(peer_id: i64, kind: EntityKind) -> Entity {
        Entity {
            peer_id,
            kind,
            title: None,
            handle: None,
        }
    }

    fn resolver(transport: Arc<MockTransport>) -> TargetResolver<MockTransport> {
        TargetResolver::new(transport, 100, Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_resolve_handle_and_cache() {
        let transport = Arc::new(MockTransport::new());
        transport.register_entity("@grp", entity(10, EntityKind::Supergroup));
        let resolver = resolver(transport.clone());

        assert_eq!(resolver.resolve("@grp").await.unwrap().peer_id, 10);
        assert_eq!(resolver.resolve("@grp").await.unwrap().peer_id, 10);
        // Second lookup served from cache
        assert_eq!(transport.resolve_call_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_retry_for_positive_id() {
        let transport = Arc::new(MockTransport::new());
        transport.register_entity("-1001234", entity(-1001234, EntityKind::Supergroup));
        let resolver = resolver(transport.clone());

        let resolved = resolver.resolve("1234").await.unwrap();
        assert_eq!(resolved.peer_id, -1001234);
        assert_eq!(transport.resolve_call_count(), 2);
    }

    #[tokio::test]
    async fn test_no_broadcast_retry_for_handles() {
        let transport = Arc::new(MockTransport::new());
        let resolver = resolver(transport.clone());

        let err = resolver.resolve("@missing").await.unwrap_err();
        assert!(matches!(err, ResolutionError::NotFound { .. }));
        assert_eq!(transport.resolve_call_count(), 1);
    }

    #[tokio::test]
    async fn test_non_group_rejected_and_not_cached() {
        let transport = Arc::new(MockTransport::new());
        transport.register_entity("@chan", entity(5, EntityKind::Channel));
        let resolver = resolver(transport.clone());

        let err = resolver.resolve("@chan").await.unwrap_err();
        assert!(matches!(err, ResolutionError::NotGroupLike { .. }));
        assert_eq!(resolver.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_connection_failure_maps_to_transport() {
        let transport = Arc::new(MockTransport::new());
        transport.drop_connection();
        let resolver = resolver(transport);

        let err = resolver.resolve("@grp").await.unwrap_err();
        assert!(matches!(err, ResolutionError::Transport { .. }));
    }
}
