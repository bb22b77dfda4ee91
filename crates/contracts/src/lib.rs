//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Timestamps are unix seconds (u64) as stored by the persistence layer
//! - Sub-second pacing delays are expressed in milliseconds in `EngineConfig`

mod engine_config;
mod entity;
mod error;
mod link;
mod notifier;
mod principal;
mod store;

pub use engine_config::*;
pub use entity::*;
pub use error::*;
pub use link::*;
pub use notifier::{LocalNotifier, Notifier};
pub use principal::*;
pub use store::{LocalStateStore, StateStore};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
