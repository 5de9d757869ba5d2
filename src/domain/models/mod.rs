pub mod attempt;
pub mod config;
pub mod outcome;
pub mod snapshot;
pub mod verdict;

pub use attempt::{AttemptResult, RunState};
pub use config::{ExpectedChange, LoggingConfig, TestConfig};
pub use outcome::{OutcomeContext, OutcomeRecord, OutcomeStatus, SuccessPolicy};
pub use snapshot::{SnapshotPair, StateSnapshot};
pub use verdict::{
    AnalysisVerdict, AttemptVerdict, BalanceVerification, ResponseTimeStats, Severity,
};
