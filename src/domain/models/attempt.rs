use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::outcome::OutcomeRecord;
use super::snapshot::SnapshotPair;

/// Everything observed during one barrier-synchronized attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptResult {
    /// 1-based attempt index
    pub attempt: u32,

    /// Number of tasks dispatched
    pub width: usize,

    /// Records in completion order
    pub records: Vec<OutcomeRecord>,

    /// Request ids whose task had not finished at the attempt deadline
    pub pending_request_ids: Vec<u64>,

    /// Balance snapshots, when verification ran successfully on both sides
    pub snapshots: Option<SnapshotPair>,

    /// Release-to-completion window
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,

    /// When the barrier opened
    #[serde(skip)]
    pub released_at: Option<Instant>,

    /// Partial completion, probe failure or barrier trouble
    pub degraded: bool,

    /// Why the attempt is degraded
    pub notes: Vec<String>,
}

impl AttemptResult {
    pub fn success_count(&self) -> usize {
        self.records.iter().filter(|r| r.success).count()
    }

    /// Mark the attempt degraded with an explanation
    pub fn degrade(&mut self, note: impl Into<String>) {
        self.degraded = true;
        self.notes.push(note.into());
    }

    /// Spread between the earliest and latest request start
    pub fn start_spread(&self) -> Option<Duration> {
        let earliest = self.records.iter().map(|r| r.request_started).min()?;
        let latest = self.records.iter().map(|r| r.request_started).max()?;
        Some(latest.duration_since(earliest))
    }
}

/// Accumulated state of one run, threaded through the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub attempts: Vec<AttemptResult>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            attempts: Vec::new(),
        }
    }

    /// All records of all attempts, attempt by attempt, each in completion order
    pub fn records(&self) -> impl Iterator<Item = &OutcomeRecord> {
        self.attempts.iter().flat_map(|a| a.records.iter())
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}
