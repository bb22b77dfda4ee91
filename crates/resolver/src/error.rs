//! Resolution error definitions

use contracts::TransportError;
use thiserror::Error;

/// Why a target identifier could not be resolved to a usable destination
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// Identifier does not resolve to any entity
    #[error("no entity found for '{target}'")]
    NotFound { target: String },

    /// Resolved, but not a multi-member group destination
    #[error("'{target}' is not a group-like destination")]
    NotGroupLike { target: String },

    /// Platform asked us to slow down during resolution
    #[error("rate limited during resolution, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// No permission to see the entity
    #[error("permission denied for '{target}': {reason}")]
    PermissionDenied { target: String, reason: String },

    /// Transport-level failure unrelated to the target itself
    #[error("transport failure: {reason}")]
    Transport { reason: String },

    /// Anything else
    #[error("resolution failed for '{target}': {reason}")]
    Unknown { target: String, reason: String },
}

impl ResolutionError {
    /// Classify a transport error raised while resolving `target`
    pub fn from_transport(target: &str, err: TransportError) -> Self {
        match err {
            TransportError::NotFound { .. } => Self::NotFound {
                target: target.to_string(),
            },
            TransportError::RateLimited { retry_after_secs } => {
                Self::RateLimited { retry_after_secs }
            }
            TransportError::PermissionDenied { reason, .. }
            | TransportError::AccessForbidden { reason, .. } => Self::PermissionDenied {
                target: target.to_string(),
                reason,
            },
            TransportError::Connection { reason } | TransportError::SessionRevoked { reason } => {
                Self::Transport { reason }
            }
            TransportError::Unknown { reason } => Self::Unknown {
                target: target.to_string(),
                reason,
            },
        }
    }
}
