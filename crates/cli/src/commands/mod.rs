//! CLI command implementations

mod run;
mod validate;

pub use run::run_engine;
pub use validate::run_validate;
