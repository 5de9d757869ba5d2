//! Concurrent dispatcher
//!
//! Spawns one task per request, parks them all on a [`ReleaseBarrier`], opens
//! the barrier, and collects exactly one outcome record per finished task.

use futures::stream::{FuturesUnordered, StreamExt};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::AbortHandle;
use tracing::{debug, info, instrument, warn};

use crate::application::barrier::ReleaseBarrier;
use crate::domain::errors::TransportError;
use crate::domain::models::{OutcomeContext, OutcomeRecord, SuccessPolicy, TestConfig};
use crate::domain::ports::{TransactionRequest, TransactionTransport};

/// Upper bound on how long the controller waits for tasks to park
const DEFAULT_GATHER_LIMIT: Duration = Duration::from_secs(5);

/// Uniform random delay applied after release and before the request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Jitter {
    max: Duration,
}

impl Jitter {
    pub const fn none() -> Self {
        Self {
            max: Duration::ZERO,
        }
    }

    pub const fn up_to(max: Duration) -> Self {
        Self { max }
    }

    /// Upper bound of [`sample`](Self::sample)
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Draw a delay in `[0, max]`
    pub fn sample(&self) -> Duration {
        if self.max.is_zero() {
            return Duration::ZERO;
        }
        let upper = u64::try_from(self.max.as_micros()).unwrap_or(u64::MAX);
        Duration::from_micros(rand::thread_rng().gen_range(0..=upper))
    }
}

/// Per-run dispatch parameters
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Requests per attempt
    pub width: usize,
    pub amount: f64,
    pub request_timeout: Duration,
    pub jitter: Jitter,
    /// How long to wait for every task to park before releasing anyway
    pub gather_limit: Duration,
}

impl From<&TestConfig> for DispatchSettings {
    fn from(config: &TestConfig) -> Self {
        Self {
            width: config.concurrency,
            amount: config.amount,
            request_timeout: config.request_timeout(),
            jitter: Jitter::up_to(config.jitter()),
            gather_limit: DEFAULT_GATHER_LIMIT,
        }
    }
}

/// Records collected from one barrier-synchronized dispatch
#[derive(Debug, Clone)]
pub struct DispatchReport {
    /// Completion order
    pub records: Vec<OutcomeRecord>,
    /// Tasks that had not finished by the attempt deadline (aborted)
    pub pending_request_ids: Vec<u64>,
    pub released_at: Instant,
    /// Release-to-completion window
    pub duration: Duration,
    /// Anomalies worth flagging on the attempt
    pub notes: Vec<String>,
}

/// State every request task reads; never mutated during dispatch
#[derive(Clone)]
struct SharedContext {
    transport: Arc<dyn TransactionTransport>,
    policy: SuccessPolicy,
    amount: f64,
    request_timeout: Duration,
    jitter: Jitter,
    csrf_token: Option<String>,
}

/// Fires `width` simultaneous requests per call to [`dispatch`](Self::dispatch)
pub struct ConcurrentDispatcher {
    shared: Arc<SharedContext>,
    width: usize,
    gather_limit: Duration,
}

impl ConcurrentDispatcher {
    pub fn new(transport: Arc<dyn TransactionTransport>, settings: DispatchSettings) -> Self {
        Self {
            shared: Arc::new(SharedContext {
                transport,
                policy: SuccessPolicy::any_2xx(),
                amount: settings.amount,
                request_timeout: settings.request_timeout,
                jitter: settings.jitter,
                csrf_token: None,
            }),
            width: settings.width,
            gather_limit: settings.gather_limit,
        }
    }

    /// Replace the status-code success policy
    #[must_use]
    pub fn with_success_policy(mut self, policy: SuccessPolicy) -> Self {
        Arc::make_mut(&mut self.shared).policy = policy;
        self
    }

    /// Attach the CSRF token sent with every request
    #[must_use]
    pub fn with_csrf_token(mut self, token: Option<String>) -> Self {
        Arc::make_mut(&mut self.shared).csrf_token = token;
        self
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    /// Run one attempt against an armed barrier
    ///
    /// Spawns `barrier.expected()` tasks, waits for them to park, releases the
    /// barrier, then collects records until all tasks finish or `deadline`
    /// (measured from release) passes. Tasks still running at the deadline are
    /// aborted and reported as pending.
    #[instrument(skip(self, barrier), fields(width = barrier.expected()))]
    pub async fn dispatch(
        &self,
        barrier: &ReleaseBarrier,
        attempt: u32,
        deadline: Duration,
    ) -> DispatchReport {
        let width = barrier.expected();
        let first_request_id = u64::from(attempt.saturating_sub(1)) * width as u64;

        let mut running = FuturesUnordered::new();
        let mut abort_handles: Vec<(u64, AbortHandle)> = Vec::with_capacity(width);

        for sequence in 0..width {
            let request_id = first_request_id + sequence as u64;
            let task = RequestTask {
                shared: Arc::clone(&self.shared),
                request_id,
                sequence,
                attempt,
            };
            let handle = tokio::spawn(task.run(barrier.clone()));
            abort_handles.push((request_id, handle.abort_handle()));
            running.push(async move { (request_id, handle.await) });
        }

        let mut notes = Vec::new();
        if let Err(err) = barrier.wait_for_participants(self.gather_limit).await {
            warn!(error = %err, "releasing barrier before every task parked");
            notes.push(err.to_string());
        }

        let released_at = match barrier.release() {
            Ok(at) => at,
            Err(err) => {
                warn!(error = %err, "barrier released outside the dispatcher");
                notes.push(err.to_string());
                barrier.released_at().unwrap_or_else(Instant::now)
            }
        };
        info!(
            attempt,
            width,
            jitter_ms = self.shared.jitter.max().as_millis(),
            "released {} simultaneous requests",
            width
        );

        let cutoff = tokio::time::Instant::from_std(released_at + deadline);
        let mut records = Vec::with_capacity(width);
        let mut finished = HashSet::with_capacity(width);

        loop {
            match tokio::time::timeout_at(cutoff, running.next()).await {
                Ok(Some((request_id, Ok(record)))) => {
                    finished.insert(request_id);
                    records.push(record);
                }
                Ok(Some((request_id, Err(join_err)))) => {
                    warn!(request_id, error = %join_err, "request task ended without an outcome");
                    notes.push(format!("request {request_id} ended without an outcome: {join_err}"));
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        attempt,
                        collected = records.len(),
                        width,
                        "attempt deadline reached with requests still running"
                    );
                    break;
                }
            }
        }
        drop(running);

        let pending_request_ids: Vec<u64> = abort_handles
            .iter()
            .filter(|(request_id, _)| !finished.contains(request_id))
            .map(|(request_id, handle)| {
                handle.abort();
                *request_id
            })
            .collect();

        let duration = released_at.elapsed();
        debug!(
            attempt,
            collected = records.len(),
            pending = pending_request_ids.len(),
            elapsed_ms = duration.as_millis(),
            "dispatch finished"
        );

        DispatchReport {
            records,
            pending_request_ids,
            released_at,
            duration,
            notes,
        }
    }
}

/// One request: park, jitter, send, record
struct RequestTask {
    shared: Arc<SharedContext>,
    request_id: u64,
    sequence: usize,
    attempt: u32,
}

impl RequestTask {
    async fn run(self, barrier: ReleaseBarrier) -> OutcomeRecord {
        barrier.await_release().await;

        let delay = self.shared.jitter.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let request = TransactionRequest::new(
            self.request_id,
            self.shared.amount,
            self.shared.csrf_token.clone(),
        );
        let context = OutcomeContext {
            request_id: self.request_id,
            sequence: self.sequence,
            attempt: self.attempt,
            request_started: Instant::now(),
        };

        let submitted =
            tokio::time::timeout(self.shared.request_timeout, self.shared.transport.submit(&request))
                .await;

        match submitted {
            Ok(Ok(response)) => context.response(response.status, response.body, &self.shared.policy),
            Ok(Err(err)) => {
                debug!(request_id = self.request_id, error = %err, "request failed");
                context.error(&err)
            }
            Err(_) => context.error(&TransportError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::TransportErrorKind;
    use crate::domain::ports::TransportResponse;
    use async_trait::async_trait;

    /// Returns 200 for sequence 0 and 409 otherwise; hangs for listed request ids
    struct StubTransport {
        hang: Vec<u64>,
    }

    #[async_trait]
    impl TransactionTransport for StubTransport {
        async fn submit(
            &self,
            request: &TransactionRequest,
        ) -> Result<TransportResponse, TransportError> {
            if self.hang.contains(&request.request_id) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            let status = if request.request_id % 10 == 0 { 200 } else { 409 };
            Ok(TransportResponse {
                status,
                body: serde_json::json!({ "id": request.request_id }),
            })
        }
    }

    fn dispatcher(width: usize, hang: Vec<u64>, timeout: Duration) -> ConcurrentDispatcher {
        ConcurrentDispatcher::new(
            Arc::new(StubTransport { hang }),
            DispatchSettings {
                width,
                amount: 100.0,
                request_timeout: timeout,
                jitter: Jitter::none(),
                gather_limit: Duration::from_secs(1),
            },
        )
    }

    #[test]
    fn test_jitter_bounds() {
        assert_eq!(Jitter::none().sample(), Duration::ZERO);
        assert_eq!(Jitter::none().max(), Duration::ZERO);
        assert_eq!(
            Jitter::up_to(Duration::from_millis(5)).max(),
            Duration::from_millis(5)
        );
        let jitter = Jitter::up_to(Duration::from_millis(5));
        for _ in 0..200 {
            assert!(jitter.sample() <= Duration::from_millis(5));
        }
    }

    #[tokio::test]
    async fn test_one_record_per_task() {
        let dispatcher = dispatcher(10, vec![], Duration::from_secs(1));
        let barrier = ReleaseBarrier::arm(10).unwrap();
        let report = dispatcher.dispatch(&barrier, 1, Duration::from_secs(2)).await;

        assert_eq!(report.records.len(), 10);
        assert!(report.pending_request_ids.is_empty());
        let sequences: HashSet<usize> = report.records.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, (0..10).collect());
        assert_eq!(report.records.iter().filter(|r| r.success).count(), 1);
    }

    #[tokio::test]
    async fn test_request_ids_continue_across_attempts() {
        let dispatcher = dispatcher(4, vec![], Duration::from_secs(1));
        let barrier = ReleaseBarrier::arm(4).unwrap();
        let report = dispatcher.dispatch(&barrier, 3, Duration::from_secs(2)).await;

        let mut ids: Vec<u64> = report.records.iter().map(|r| r.request_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![8, 9, 10, 11]);
        assert!(report.records.iter().all(|r| r.attempt == 3));
    }

    #[tokio::test]
    async fn test_request_timeout_becomes_error_outcome() {
        let dispatcher = dispatcher(3, vec![1], Duration::from_millis(50));
        let barrier = ReleaseBarrier::arm(3).unwrap();
        let report = dispatcher.dispatch(&barrier, 1, Duration::from_secs(2)).await;

        assert_eq!(report.records.len(), 3);
        let timed_out = report
            .records
            .iter()
            .find(|r| r.request_id == 1)
            .expect("timed out request still yields a record");
        assert_eq!(timed_out.error_kind(), Some(TransportErrorKind::Timeout));
        assert!(!timed_out.success);
    }

    #[tokio::test]
    async fn test_deadline_leaves_pending_requests() {
        let dispatcher = dispatcher(5, vec![2, 4], Duration::from_secs(30));
        let barrier = ReleaseBarrier::arm(5).unwrap();
        let report = dispatcher.dispatch(&barrier, 1, Duration::from_millis(200)).await;

        assert_eq!(report.records.len(), 3);
        let mut pending = report.pending_request_ids.clone();
        pending.sort_unstable();
        assert_eq!(pending, vec![2, 4]);
    }

    #[tokio::test]
    async fn test_pre_released_barrier_is_noted() {
        let dispatcher = dispatcher(2, vec![], Duration::from_secs(1));
        let barrier = ReleaseBarrier::arm(2).unwrap();
        barrier.release().unwrap();
        let report = dispatcher.dispatch(&barrier, 1, Duration::from_secs(2)).await;

        assert_eq!(report.records.len(), 2);
        assert!(report.notes.iter().any(|n| n.contains("already released")));
    }
}
