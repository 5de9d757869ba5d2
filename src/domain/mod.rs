//! Domain layer for the race tester
//!
//! Data model, error taxonomy and the ports implemented by infrastructure.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{BarrierError, ProbeError, TransportError, TransportErrorKind};
