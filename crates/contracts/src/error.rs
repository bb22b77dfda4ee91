//! Layered error definitions
//!
//! Categorized by source: transport / store / link / config

use thiserror::Error;

/// Errors surfaced by a transport implementation
///
/// Variants carry the classification the engine acts on; the original
/// platform error message travels in the `reason` field.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Platform asked us to slow down
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// No permission to write into the destination (membership intact)
    #[error("permission denied for '{target}': {reason}")]
    PermissionDenied { target: String, reason: String },

    /// Destination fundamentally inaccessible (private, banned, blocked)
    #[error("access forbidden for '{target}': {reason}")]
    AccessForbidden { target: String, reason: String },

    /// Identifier does not resolve to any entity
    #[error("not found: {target}")]
    NotFound { target: String },

    /// Transient connectivity failure
    #[error("connection error: {reason}")]
    Connection { reason: String },

    /// Session credential invalidated by the platform
    #[error("session revoked: {reason}")]
    SessionRevoked { reason: String },

    /// Anything the transport could not classify
    #[error("transport error: {reason}")]
    Unknown { reason: String },
}

impl TransportError {
    /// Create permission-denied error
    pub fn permission_denied(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create access-forbidden error
    pub fn access_forbidden(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AccessForbidden {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create not-found error
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::NotFound {
            target: target.into(),
        }
    }

    /// Create connection error
    pub fn connection(reason: impl Into<String>) -> Self {
        Self::Connection {
            reason: reason.into(),
        }
    }

    /// Create session-revoked error
    pub fn session_revoked(reason: impl Into<String>) -> Self {
        Self::SessionRevoked {
            reason: reason.into(),
        }
    }

    /// Create unclassified error
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self::Unknown {
            reason: reason.into(),
        }
    }

    /// The session credential itself is dead; reconnecting cannot help
    pub fn is_fatal_session(&self) -> bool {
        matches!(self, Self::SessionRevoked { .. })
    }
}

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Serialization or deserialization failure
    #[error("store codec error: {message}")]
    Codec { message: String },

    /// Backend failure
    #[error("store backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Create codec error
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Create backend error
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }
}

/// Message-link parse failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    /// Too few path segments to carry a chat and a message id
    #[error("malformed message link: {link}")]
    Malformed { link: String },

    /// Last path segment is not a message id
    #[error("invalid message id in link: {link}")]
    InvalidMessageId { link: String },
}
