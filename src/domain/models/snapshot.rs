use chrono::{DateTime, Utc};
use serde::Serialize;

/// Observed balance/state value at a point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub value: f64,
    pub captured_at: DateTime<Utc>,
    /// Probe response the value was extracted from
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub raw_response: serde_json::Value,
}

impl StateSnapshot {
    pub fn new(value: f64, raw_response: serde_json::Value) -> Self {
        Self {
            value,
            captured_at: Utc::now(),
            raw_response,
        }
    }

    /// Snapshot without a backing response, for callers that already hold the value
    pub fn of(value: f64) -> Self {
        Self::new(value, serde_json::Value::Null)
    }
}

/// Snapshots bracketing one attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotPair {
    pub before: StateSnapshot,
    pub after: StateSnapshot,
}

impl SnapshotPair {
    /// `after − before`
    pub fn delta(&self) -> f64 {
        self.after.value - self.before.value
    }
}
