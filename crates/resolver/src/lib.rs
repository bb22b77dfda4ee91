//! # Resolver
//!
//! Target resolution: identifier normalization, platform lookup with a
//! broadcast-id retry, group-like filtering, and a bounded TTL cache of
//! resolved entities.

mod cache;
mod error;
mod resolver;

pub use cache::EntityCache;
pub use error::ResolutionError;
pub use resolver::TargetResolver;
