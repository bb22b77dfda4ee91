//! # Fanout
//!
//! Batched delivery of one payload to every resolved target of a
//! principal: resolution pass with invalid-target pruning, paced batches,
//! flood-wait retry, failure classification and the end-of-dispatch
//! summary.

mod error;
mod sender;

pub use error::FanoutError;
pub use sender::{DispatchReport, FanoutSender};
