//! Command implementations

pub mod run;

pub use run::{execute, run_test};
