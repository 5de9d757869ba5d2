//! Application layer: the synchronization engine
//!
//! - `barrier`: holds request tasks until a single release
//! - `dispatcher`: fires one attempt's worth of simultaneous requests
//! - `orchestrator`: sequences attempts and balance snapshots

pub mod barrier;
pub mod dispatcher;
pub mod orchestrator;

pub use barrier::ReleaseBarrier;
pub use dispatcher::{ConcurrentDispatcher, DispatchReport, DispatchSettings, Jitter};
pub use orchestrator::{AttemptOrchestrator, OrchestratorSettings};
