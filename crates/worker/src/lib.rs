//! # Worker
//!
//! The per-principal dispatch loop (mode expiry, forward specs, copy
//! with watermarking) and the supervisor that reconciles desired state
//! against running workers.

mod error;
mod supervisor;
mod watermark;
mod worker;

pub use error::WorkerError;
pub use supervisor::WorkerSupervisor;
pub use watermark::{prepare_copy, select_watermark};
pub use worker::DispatchWorker;
