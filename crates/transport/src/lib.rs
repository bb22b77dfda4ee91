//! # Transport
//!
//! Messaging-platform client abstraction: the `Transport` trait, the
//! process-wide per-principal registries, and a mock implementation with
//! injectable failure scenarios for tests.

mod client;
mod mock;
mod registry;

pub use client::Transport;
pub use mock::{MockConfig, MockTransport, SentMessage};
pub use registry::{TransportRegistry, WorkerRegistry};
