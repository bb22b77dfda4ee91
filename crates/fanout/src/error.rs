//! Fan-out error definitions

use contracts::StoreError;
use thiserror::Error;

/// Dispatch-aborting failures
///
/// Per-target delivery failures are not errors; they land in the
/// `DispatchReport`. Only conditions that invalidate the whole dispatch
/// surface here.
#[derive(Debug, Error)]
pub enum FanoutError {
    /// The session died mid-dispatch and could not be recovered
    #[error("session lost during dispatch")]
    SessionLost,

    /// Persistence failure while updating the target list
    #[error(transparent)]
    Store(#[from] StoreError),
}
