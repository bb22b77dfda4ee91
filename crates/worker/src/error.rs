//! Worker error definitions

use contracts::{PrincipalId, StoreError};
use thiserror::Error;

/// Worker and supervisor errors
#[derive(Debug, Error)]
pub enum WorkerError {
    /// No transport session registered for the principal
    #[error("no transport session registered for principal {principal}")]
    NotRegistered { principal: PrincipalId },

    /// Persistence failure
    #[error(transparent)]
    Store(#[from] StoreError),
}
