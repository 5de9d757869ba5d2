//! Port trait definitions (Hexagonal Architecture)
//!
//! Interfaces the engine depends on; the HTTP adapters in
//! `infrastructure::http` implement them:
//! - TransactionTransport: fires one transaction at the target
//! - StateProbe: reads the balance/state value
//! - TokenSource: retrieves a CSRF token before the first attempt

pub mod transport;

pub use transport::{
    StateProbe, TokenSource, TransactionRequest, TransactionTransport, TransportResponse,
};
