//! Raceprobe - barrier-synchronized race condition tester
//!
//! Fires N identical transaction requests at a target so they all leave at
//! the same instant, then decides from status codes and (optionally) the
//! balance before and after whether the target let more than one through.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): data model, error taxonomy and ports
//! - **Application Layer** (`application`): barrier, dispatcher, orchestrator
//! - **Service Layer** (`services`): pure verdict analysis
//! - **Infrastructure Layer** (`infrastructure`): HTTP adapters, config, logging
//! - **CLI Layer** (`cli`): command-line interface and report output
//!
//! # Example
//!
//! ```ignore
//! use raceprobe::cli::commands::run_test;
//! use raceprobe::domain::models::TestConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TestConfig {
//!         target_url: "https://staging.bank.test/api/transfer".into(),
//!         auth_token: std::env::var("RACEPROBE_TOKEN")?,
//!         ..Default::default()
//!     };
//!     let (_state, verdict) = run_test(&config, |_| {}).await?;
//!     println!("{}", verdict.severity);
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{AttemptOrchestrator, ConcurrentDispatcher, ReleaseBarrier};
pub use domain::models::{AnalysisVerdict, RunState, Severity, TestConfig};
pub use domain::ports::{StateProbe, TokenSource, TransactionTransport};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::VerdictAnalyzer;
