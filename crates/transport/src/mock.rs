//! Mock transport
//!
//! Mock implementation for unit tests, with injectable failure scenarios.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use contracts::{Entity, Formatting, MediaRef, PeerId, TargetRef, TransportError};
use tracing::instrument;

use crate::client::Transport;

/// Mock transport configuration
#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    /// Peers that reject every send with a permission error
    pub restricted_peers: Vec<PeerId>,
    /// Peers that reject every send with a fundamental-access error
    pub forbidden_peers: Vec<PeerId>,
    /// Peers that fail every send with a connection error
    pub unreachable_peers: Vec<PeerId>,
    /// Peers whose first send is rate limited (peer -> retry_after_secs)
    pub rate_limit_once: HashMap<PeerId, u64>,
    /// Peers whose send revokes the whole session (platform-side
    /// credential death mid-dispatch)
    pub revoke_on_send: Vec<PeerId>,
    /// Number of connect attempts that should fail before one succeeds
    pub connect_failures: u32,
}

/// A message recorded by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum SentMessage {
    Text {
        peer: PeerId,
        text: String,
    },
    Media {
        peer: PeerId,
        file_id: i64,
        caption: String,
    },
    Forward {
        peer: PeerId,
        source_chat: String,
        message_id: i64,
    },
}

/// Mock transport
pub struct MockTransport {
    config: MockConfig,
    connected: AtomicBool,
    authorized: AtomicBool,
    session_revoked: AtomicBool,
    remaining_connect_failures: AtomicU32,
    /// Registered entities (key = target ref rendered as string)
    entities: Mutex<HashMap<String, Entity>>,
    /// Rate limits not yet tripped
    pending_rate_limits: Mutex<HashMap<PeerId, u64>>,
    sent: Mutex<Vec<SentMessage>>,
    resolve_calls: AtomicU32,
    connect_calls: AtomicU32,
}

impl MockTransport {
    /// Create default mock transport (connected and authorized)
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// Create mock transport with a failure-injection configuration
    pub fn with_config(config: MockConfig) -> Self {
        let pending_rate_limits = Mutex::new(config.rate_limit_once.clone());
        let remaining_connect_failures = AtomicU32::new(config.connect_failures);
        Self {
            config,
            connected: AtomicBool::new(true),
            authorized: AtomicBool::new(true),
            session_revoked: AtomicBool::new(false),
            remaining_connect_failures,
            entities: Mutex::new(HashMap::new()),
            pending_rate_limits,
            sent: Mutex::new(Vec::new()),
            resolve_calls: AtomicU32::new(0),
            connect_calls: AtomicU32::new(0),
        }
    }

    /// Register an entity under the string form of a target ref
    pub fn register_entity(&self, key: impl Into<String>, entity: Entity) {
        self.entities.lock().unwrap().insert(key.into(), entity);
    }

    /// Drop the connection (next `is_connected` returns false)
    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Mark the session credential unauthorized (non-fatal)
    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    /// Mark the session credential revoked by the platform (fatal)
    pub fn revoke_session(&self) {
        self.session_revoked.store(true, Ordering::SeqCst);
    }

    /// Messages recorded so far, in send order
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of resolve calls that reached the platform
    pub fn resolve_call_count(&self) -> u32 {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    /// Number of connect attempts
    pub fn connect_call_count(&self) -> u32 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    fn check_session(&self) -> Result<(), TransportError> {
        if self.session_revoked.load(Ordering::SeqCst) {
            return Err(TransportError::session_revoked("mock revocation"));
        }
        Ok(())
    }

    fn check_send(&self, peer: PeerId) -> Result<(), TransportError> {
        self.check_session()?;
        if self.config.revoke_on_send.contains(&peer) {
            self.session_revoked.store(true, Ordering::SeqCst);
            return Err(TransportError::session_revoked("mock revocation"));
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::connection("mock disconnected"));
        }
        if self.config.unreachable_peers.contains(&peer) {
            return Err(TransportError::connection("mock unreachable peer"));
        }
        if self.config.forbidden_peers.contains(&peer) {
            return Err(TransportError::access_forbidden(
                peer.to_string(),
                "mock forbidden",
            ));
        }
        if self.config.restricted_peers.contains(&peer) {
            return Err(TransportError::permission_denied(
                peer.to_string(),
                "mock restricted",
            ));
        }
        if let Some(retry_after) = self.pending_rate_limits.lock().unwrap().remove(&peer) {
            return Err(TransportError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    #[instrument(name = "mock_transport_connect", skip(self))]
    async fn connect(&self) -> Result<(), TransportError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.check_session()?;

        let remaining = self.remaining_connect_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_connect_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(TransportError::connection("mock connect failure"));
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn is_authorized(&self) -> Result<bool, TransportError> {
        self.check_session()?;
        Ok(self.authorized.load(Ordering::SeqCst))
    }

    #[instrument(name = "mock_transport_disconnect", skip(self))]
    async fn disconnect(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        self.authorized.store(false, Ordering::SeqCst);
        Ok(())
    }

    #[instrument(name = "mock_transport_resolve", skip(self), fields(target = %target))]
    async fn resolve_identity(&self, target: &TargetRef) -> Result<Entity, TransportError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        self.check_session()?;
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::connection("mock disconnected"));
        }

        self.entities
            .lock()
            .unwrap()
            .get(&target.to_string())
            .cloned()
            .ok_or_else(|| TransportError::not_found(target.to_string()))
    }

    #[instrument(name = "mock_transport_send_text", skip(self, text, _formatting), fields(peer))]
    async fn send_text(
        &self,
        peer: PeerId,
        text: &str,
        _formatting: Option<&Formatting>,
    ) -> Result<(), TransportError> {
        self.check_send(peer)?;
        self.sent.lock().unwrap().push(SentMessage::Text {
            peer,
            text: text.to_string(),
        });
        Ok(())
    }

    #[instrument(
        name = "mock_transport_send_media",
        skip(self, media, caption, _formatting),
        fields(peer, file_id = media.file_id)
    )]
    async fn send_media(
        &self,
        peer: PeerId,
        media: &MediaRef,
        caption: &str,
        _formatting: Option<&Formatting>,
    ) -> Result<(), TransportError> {
        self.check_send(peer)?;
        self.sent.lock().unwrap().push(SentMessage::Media {
            peer,
            file_id: media.file_id,
            caption: caption.to_string(),
        });
        Ok(())
    }

    #[instrument(
        name = "mock_transport_forward",
        skip(self),
        fields(peer, source_chat = %source_chat, message_id)
    )]
    async fn forward_message(
        &self,
        peer: PeerId,
        source_chat: &str,
        message_id: i64,
    ) -> Result<(), TransportError> {
        self.check_send(peer)?;
        self.sent.lock().unwrap().push(SentMessage::Forward {
            peer,
            source_chat: source_chat.to_string(),
            message_id,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::EntityKind;

    fn group(peer_id: PeerId) -> Entity {
        Entity {
            peer_id,
            kind: EntityKind::Group,
            title: Some("test group".into()),
            handle: None,
        }
    }

    #[tokio::test]
    async fn test_resolve_registered_entity() {
        let transport = MockTransport::new();
        transport.register_entity("@grp", group(10));

        let entity = transport
            .resolve_identity(&TargetRef::Handle("@grp".into()))
            .await
            .unwrap();
        assert_eq!(entity.peer_id, 10);
        assert_eq!(transport.resolve_call_count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_unknown_is_not_found() {
        let transport = MockTransport::new();
        let err = transport
            .resolve_identity(&TargetRef::Id(999))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_rate_limit_trips_once() {
        let transport = MockTransport::with_config(MockConfig {
            rate_limit_once: HashMap::from([(5, 10)]),
            ..Default::default()
        });

        let err = transport.send_text(5, "hi", None).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::RateLimited {
                retry_after_secs: 10
            }
        ));

        // Second attempt goes through
        transport.send_text(5, "hi", None).await.unwrap();
        assert_eq!(transport.sent_messages().len(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_injection() {
        let transport = MockTransport::with_config(MockConfig {
            connect_failures: 2,
            ..Default::default()
        });
        transport.drop_connection();

        assert!(transport.connect().await.is_err());
        assert!(transport.connect().await.is_err());
        transport.connect().await.unwrap();
        assert!(transport.is_connected().await);
        assert_eq!(transport.connect_call_count(), 3);
    }

    #[tokio::test]
    async fn test_revoked_session_poisons_all_operations() {
        let transport = MockTransport::new();
        transport.revoke_session();

        let err = transport.is_authorized().await.unwrap_err();
        assert!(err.is_fatal_session());
        let err = transport.send_text(1, "x", None).await.unwrap_err();
        assert!(err.is_fatal_session());
    }

    #[tokio::test]
    async fn test_revoke_on_send_kills_the_session() {
        let transport = MockTransport::with_config(MockConfig {
            revoke_on_send: vec![5],
            ..Default::default()
        });
        assert!(transport.is_authorized().await.unwrap());

        let err = transport.send_text(5, "x", None).await.unwrap_err();
        assert!(err.is_fatal_session());
        // The credential stays dead afterwards
        assert!(transport.is_authorized().await.unwrap_err().is_fatal_session());
    }

    #[tokio::test]
    async fn test_forward_recorded_in_order() {
        let transport = MockTransport::new();
        transport.forward_message(1, "chan", 42).await.unwrap();
        transport.send_text(2, "hello", None).await.unwrap();

        let sent = transport.sent_messages();
        assert_eq!(
            sent[0],
            SentMessage::Forward {
                peer: 1,
                source_chat: "chan".into(),
                message_id: 42
            }
        );
        assert_eq!(
            sent[1],
            SentMessage::Text {
                peer: 2,
                text: "hello".into()
            }
        );
    }
}
