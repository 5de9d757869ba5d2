//! Attempt orchestrator
//!
//! Runs race attempts one after another, each with a fresh barrier and
//! optionally bracketed by balance snapshots, and appends every result to the
//! caller's [`RunState`].

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::application::barrier::ReleaseBarrier;
use crate::application::dispatcher::ConcurrentDispatcher;
use crate::domain::models::{AttemptResult, RunState, SnapshotPair, StateSnapshot, TestConfig};
use crate::domain::ports::StateProbe;

/// Sequencing parameters for a run
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub attempts: u32,
    /// Time allowed after release before unfinished requests are abandoned
    pub attempt_deadline: Duration,
    /// Pause between the last response and the "after" snapshot
    pub settle: Duration,
    /// Pause between consecutive attempts
    pub attempt_interval: Duration,
}

impl From<&TestConfig> for OrchestratorSettings {
    fn from(config: &TestConfig) -> Self {
        Self {
            attempts: config.attempts,
            attempt_deadline: config.attempt_deadline(),
            settle: Duration::from_millis(config.settle_ms),
            attempt_interval: Duration::from_millis(config.attempt_interval_ms),
        }
    }
}

/// Drives attempts `1..=K` strictly sequentially
pub struct AttemptOrchestrator {
    dispatcher: ConcurrentDispatcher,
    probe: Option<Arc<dyn StateProbe>>,
    settings: OrchestratorSettings,
}

impl AttemptOrchestrator {
    pub fn new(dispatcher: ConcurrentDispatcher, settings: OrchestratorSettings) -> Self {
        Self {
            dispatcher,
            probe: None,
            settings,
        }
    }

    /// Enable balance snapshots around each attempt
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn StateProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Run every attempt and return the extended run state
    pub async fn run(&self, state: RunState) -> RunState {
        self.run_observed(state, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `observer` after each attempt
    pub async fn run_observed<F>(&self, mut state: RunState, mut observer: F) -> RunState
    where
        F: FnMut(&AttemptResult),
    {
        let total = self.settings.attempts;
        info!(run_id = %state.run_id, attempts = total, width = self.dispatcher.width(), "starting race test");

        for attempt in 1..=total {
            let result = self.run_attempt(attempt).await;
            observer(&result);
            state.attempts.push(result);

            if attempt < total && !self.settings.attempt_interval.is_zero() {
                tokio::time::sleep(self.settings.attempt_interval).await;
            }
        }

        state
    }

    /// One attempt: before snapshot, synchronized dispatch, after snapshot
    #[instrument(skip(self))]
    pub async fn run_attempt(&self, attempt: u32) -> AttemptResult {
        let width = self.dispatcher.width();
        let mut result = AttemptResult {
            attempt,
            width,
            records: Vec::new(),
            pending_request_ids: Vec::new(),
            snapshots: None,
            duration: Duration::ZERO,
            released_at: None,
            degraded: false,
            notes: Vec::new(),
        };

        let before = match &self.probe {
            Some(probe) => Self::capture(probe.as_ref(), "before", &mut result).await,
            None => None,
        };

        let barrier = match ReleaseBarrier::arm(width) {
            Ok(barrier) => barrier,
            Err(err) => {
                warn!(attempt, error = %err, "cannot arm barrier");
                result.degrade(err.to_string());
                return result;
            }
        };

        let report = self
            .dispatcher
            .dispatch(&barrier, attempt, self.settings.attempt_deadline)
            .await;
        info!(
            attempt,
            elapsed_ms = report.duration.as_millis(),
            collected = report.records.len(),
            "race attempt completed"
        );

        result.records = report.records;
        result.released_at = Some(report.released_at);
        result.duration = report.duration;
        for note in report.notes {
            result.degrade(note);
        }
        if !report.pending_request_ids.is_empty() {
            result.degrade(format!(
                "{} of {} requests unfinished at the attempt deadline",
                report.pending_request_ids.len(),
                width
            ));
        }
        result.pending_request_ids = report.pending_request_ids;

        if let (Some(before), Some(probe)) = (before, &self.probe) {
            if !self.settings.settle.is_zero() {
                tokio::time::sleep(self.settings.settle).await;
            }
            if let Some(after) = Self::capture(probe.as_ref(), "after", &mut result).await {
                result.snapshots = Some(SnapshotPair { before, after });
            }
        }

        result
    }

    async fn capture(
        probe: &dyn StateProbe,
        phase: &str,
        result: &mut AttemptResult,
    ) -> Option<StateSnapshot> {
        match probe.capture().await {
            Ok(snapshot) => {
                info!(attempt = result.attempt, phase, balance = snapshot.value, "balance captured");
                Some(snapshot)
            }
            Err(err) => {
                warn!(
                    attempt = result.attempt,
                    phase,
                    error = %err,
                    "balance snapshot failed; falling back to status codes"
                );
                result.degrade(format!("{phase} snapshot failed: {err}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatcher::{DispatchSettings, Jitter};
    use crate::domain::errors::{ProbeError, TransportError};
    use crate::domain::ports::{TransactionRequest, TransactionTransport, TransportResponse};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    struct AlwaysOk;

    #[async_trait]
    impl TransactionTransport for AlwaysOk {
        async fn submit(
            &self,
            _request: &TransactionRequest,
        ) -> Result<TransportResponse, TransportError> {
            Ok(TransportResponse {
                status: 200,
                body: serde_json::Value::Null,
            })
        }
    }

    /// Hands out queued values; an empty queue is a probe failure
    struct QueuedProbe {
        values: Mutex<VecDeque<f64>>,
    }

    impl QueuedProbe {
        fn new(values: &[f64]) -> Self {
            Self {
                values: Mutex::new(values.iter().copied().collect()),
            }
        }
    }

    #[async_trait]
    impl StateProbe for QueuedProbe {
        async fn capture(&self) -> Result<StateSnapshot, ProbeError> {
            self.values
                .lock()
                .await
                .pop_front()
                .map(StateSnapshot::of)
                .ok_or_else(|| ProbeError::Request("probe exhausted".to_string()))
        }
    }

    fn orchestrator(attempts: u32, width: usize) -> AttemptOrchestrator {
        let dispatcher = ConcurrentDispatcher::new(
            Arc::new(AlwaysOk),
            DispatchSettings {
                width,
                amount: 100.0,
                request_timeout: Duration::from_secs(1),
                jitter: Jitter::none(),
                gather_limit: Duration::from_secs(1),
            },
        );
        AttemptOrchestrator::new(
            dispatcher,
            OrchestratorSettings {
                attempts,
                attempt_deadline: Duration::from_secs(2),
                settle: Duration::ZERO,
                attempt_interval: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn test_runs_every_attempt_in_order() {
        let mut seen = Vec::new();
        let state = orchestrator(3, 4)
            .run_observed(RunState::new(), |a| seen.push(a.attempt))
            .await;

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(state.attempts.len(), 3);
        assert!(state.attempts.iter().all(|a| a.records.len() == 4 && !a.degraded));
        assert!(state.attempts.iter().all(|a| a.snapshots.is_none()));
    }

    #[tokio::test]
    async fn test_snapshots_bracket_each_attempt() {
        let probe = Arc::new(QueuedProbe::new(&[1000.0, 1100.0, 1100.0, 1200.0]));
        let state = orchestrator(2, 2).with_probe(probe).run(RunState::new()).await;

        let first = state.attempts[0].snapshots.as_ref().unwrap();
        assert!((first.delta() - 100.0).abs() < f64::EPSILON);
        let second = state.attempts[1].snapshots.as_ref().unwrap();
        assert!((second.before.value - 1100.0).abs() < f64::EPSILON);
        assert!((second.after.value - 1200.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_probe_failure_degrades_only_that_attempt() {
        let probe = Arc::new(QueuedProbe::new(&[1000.0, 1100.0, 1100.0]));
        let state = orchestrator(2, 2).with_probe(probe).run(RunState::new()).await;

        assert!(state.attempts[0].snapshots.is_some());
        assert!(!state.attempts[0].degraded);

        let second = &state.attempts[1];
        assert!(second.snapshots.is_none());
        assert!(second.degraded);
        assert!(second.notes[0].starts_with("after snapshot failed"));
        assert_eq!(second.records.len(), 2, "dispatch still ran");
    }

    #[tokio::test]
    async fn test_run_state_is_extended_not_replaced() {
        let mut state = RunState::new();
        let run_id = state.run_id;
        state = orchestrator(1, 1).run(state).await;
        state = orchestrator(1, 1).run(state).await;
        assert_eq!(state.run_id, run_id);
        assert_eq!(state.attempts.len(), 2);
    }
}
