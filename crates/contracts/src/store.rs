//! StateStore trait - principal persistence interface

use crate::error::StoreError;
use crate::principal::{PrincipalId, PrincipalState};

/// Persistence backend for principal records
///
/// Implementations reconcile the stored schema against the current one on
/// every load: missing fields come back as defaults, unknown fields are
/// dropped. A load for an unknown principal returns the default record.
#[trait_variant::make(StateStore: Send)]
pub trait LocalStateStore {
    /// Load the record for one principal
    ///
    /// # Errors
    /// Returns backend or codec errors; an absent record is not an error
    async fn load(&self, principal: PrincipalId) -> Result<PrincipalState, StoreError>;

    /// Persist the record for one principal
    async fn save(&self, principal: PrincipalId, state: &PrincipalState)
        -> Result<(), StoreError>;

    /// All principals with a stored record
    async fn principal_ids(&self) -> Result<Vec<PrincipalId>, StoreError>;
}
