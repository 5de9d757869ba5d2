//! Common test utilities for integration tests
//!
//! In-memory transports, probes and config fixtures shared across test files.

#![allow(dead_code)]

use async_trait::async_trait;
use raceprobe::domain::errors::{ProbeError, TransportError};
use raceprobe::domain::models::{StateSnapshot, TestConfig};
use raceprobe::domain::ports::{
    StateProbe, TransactionRequest, TransactionTransport, TransportResponse,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Transport answering from a script, without touching the network
///
/// The first `accept` submissions get 200, the rest get 409.
/// Request ids in `hang` never complete.
pub struct ScriptedTransport {
    accept: usize,
    latency: Duration,
    hang: HashSet<u64>,
    submitted: AtomicUsize,
}

impl ScriptedTransport {
    pub fn accepting(accept: usize) -> Self {
        Self {
            accept,
            latency: Duration::ZERO,
            hang: HashSet::new(),
            submitted: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn hanging_on(mut self, request_ids: impl IntoIterator<Item = u64>) -> Self {
        self.hang = request_ids.into_iter().collect();
        self
    }

    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionTransport for ScriptedTransport {
    async fn submit(
        &self,
        request: &TransactionRequest,
    ) -> Result<TransportResponse, TransportError> {
        if self.hang.contains(&request.request_id) {
            std::future::pending::<()>().await;
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let order = self.submitted.fetch_add(1, Ordering::SeqCst);
        let status = if order < self.accept { 200 } else { 409 };
        Ok(TransportResponse {
            status,
            body: serde_json::json!({ "request_id": request.request_id }),
        })
    }
}

/// Probe handing out queued balances; an empty queue is a failure
pub struct QueuedProbe {
    values: Mutex<VecDeque<f64>>,
}

impl QueuedProbe {
    pub fn new(values: &[f64]) -> Self {
        Self {
            values: Mutex::new(values.iter().copied().collect()),
        }
    }
}

#[async_trait]
impl StateProbe for QueuedProbe {
    async fn capture(&self) -> Result<StateSnapshot, ProbeError> {
        let next = self.values.lock().unwrap().pop_front();
        next.map(StateSnapshot::of)
            .ok_or_else(|| ProbeError::Request("probe exhausted".to_string()))
    }
}

/// Valid config pointing at `base_url`, with no pauses between phases
pub fn test_config(base_url: &str) -> TestConfig {
    TestConfig {
        target_url: format!("{base_url}/api/transfer"),
        auth_token: "secret-token".to_string(),
        concurrency: 10,
        timeout_secs: 5,
        grace_ms: 500,
        settle_ms: 0,
        attempt_interval_ms: 0,
        ..Default::default()
    }
}
