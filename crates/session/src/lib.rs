//! # Session
//!
//! Session guardianship: connectivity verification, bounded reconnect
//! with exponential backoff, transient-failure accounting, and forced
//! logout on fatal session faults.

mod error;
mod guardian;

pub use error::SessionError;
pub use guardian::{LogoutReason, SessionGuardian};
