//! Infrastructure layer module
//!
//! Adapters and ambient concerns:
//! - HTTP transport, balance probe and CSRF token source (reqwest)
//! - Configuration management (figment)
//! - Logging infrastructure (tracing)
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod http;
pub mod logging;
