//! # Store
//!
//! Persistence backends for principal records: an in-memory JSON-value
//! store with default-schema reconciliation, and a TTL read cache that
//! wraps any `StateStore`.

mod cached;
mod memory;

pub use cached::CachedStore;
pub use memory::MemoryStore;
