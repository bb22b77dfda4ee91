//! Messaging-platform client abstraction
//!
//! Defines the trait the engine drives a per-principal session through,
//! supporting real implementations and mock testing.

use std::future::Future;

use contracts::{Entity, Formatting, MediaRef, PeerId, TargetRef, TransportError};

/// Per-principal messaging client trait
///
/// One instance per authenticated principal session. All operations act
/// on behalf of that principal. Implementations classify platform errors
/// into the `TransportError` taxonomy; the engine never inspects raw
/// platform error strings.
pub trait Transport: Send + Sync {
    /// Establish (or re-establish) the underlying connection
    fn connect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Connection currently established
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// Session credential still accepted by the platform
    ///
    /// # Errors
    /// `SessionRevoked` when the platform reports the credential dead
    fn is_authorized(&self) -> impl Future<Output = Result<bool, TransportError>> + Send;

    /// Tear down the connection and invalidate the session credential
    ///
    /// Idempotent: returns Ok if already disconnected.
    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Resolve a target reference to a platform entity
    fn resolve_identity(
        &self,
        target: &TargetRef,
    ) -> impl Future<Output = Result<Entity, TransportError>> + Send;

    /// Send a text message to a resolved peer
    fn send_text(
        &self,
        peer: PeerId,
        text: &str,
        formatting: Option<&Formatting>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Send a media message (with optional caption) to a resolved peer
    fn send_media(
        &self,
        peer: PeerId,
        media: &MediaRef,
        caption: &str,
        formatting: Option<&Formatting>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Forward an existing message into a resolved peer
    ///
    /// # Arguments
    /// * `peer` - destination
    /// * `source_chat` - chat reference from the parsed message link
    /// * `message_id` - message id within the source chat
    fn forward_message(
        &self,
        peer: PeerId,
        source_chat: &str,
        message_id: i64,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
