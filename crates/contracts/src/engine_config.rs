//! Engine configuration
//!
//! Tunables for dispatch pacing, caching and session supervision. Every
//! field has a default matching production behavior, so an empty config
//! file is valid.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::principal::PrincipalId;

/// Engine-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EngineConfig {
    /// Targets per fan-out batch
    #[validate(range(min = 1, max = 500))]
    pub batch_size: usize,

    /// Pause between batches
    #[validate(range(min = 1, max = 600))]
    pub batch_delay_secs: u64,

    /// Pause after each individual send
    #[validate(range(min = 100, max = 60_000))]
    pub per_send_delay_ms: u64,

    /// Pause between the two links of a dual forward spec
    pub inter_spec_delay_secs: u64,

    /// Resolution cache capacity (entries)
    #[validate(range(min = 1, max = 10_000))]
    pub cache_capacity: usize,

    /// Resolution cache entry lifetime
    #[validate(range(min = 1))]
    pub cache_ttl_secs: u64,

    /// Read-cache lifetime over the principal store
    pub store_cache_ttl_secs: u64,

    /// Transient session warnings tolerated before forced teardown
    #[validate(range(min = 1, max = 100))]
    pub max_warnings: u32,

    /// Reconnect attempts per recovery
    #[validate(range(min = 1, max = 10))]
    pub reconnect_max_attempts: u32,

    /// Ceiling on exponential reconnect backoff
    pub reconnect_backoff_cap_secs: u64,

    /// Dispatch-cycle pacing when the principal has not set one
    #[validate(range(min = 10))]
    pub default_pacing_secs: u64,

    /// Interval of the background license/session sweep
    #[validate(range(min = 10))]
    pub license_sweep_interval_secs: u64,

    /// Principals with administrative privileges
    pub admin_ids: Vec<PrincipalId>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            batch_delay_secs: 5,
            per_send_delay_ms: 2500,
            inter_spec_delay_secs: 1,
            cache_capacity: 100,
            cache_ttl_secs: 300,
            store_cache_ttl_secs: 300,
            max_warnings: 5,
            reconnect_max_attempts: 2,
            reconnect_backoff_cap_secs: 15,
            default_pacing_secs: 120,
            license_sweep_interval_secs: 300,
            admin_ids: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Principal carries administrative privileges
    pub fn is_admin(&self, principal: PrincipalId) -> bool {
        self.admin_ids.contains(&principal)
    }
}
