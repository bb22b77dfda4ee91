//! Session error definitions

use contracts::{PrincipalId, StoreError};
use thiserror::Error;

/// Session guardianship errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// No transport session registered for the principal
    #[error("no transport session registered for principal {principal}")]
    NotRegistered { principal: PrincipalId },

    /// Session could not be recovered and has been torn down
    #[error("session unrecoverable: {reason}")]
    Unrecoverable { reason: String },

    /// Persistence failure while updating session state
    #[error(transparent)]
    Store(#[from] StoreError),
}
