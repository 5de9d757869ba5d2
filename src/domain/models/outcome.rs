use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use crate::domain::errors::{TransportError, TransportErrorKind};

/// What the target (or the network) answered to one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OutcomeStatus {
    /// The target produced an HTTP status
    Response { status_code: u16 },
    /// The request never produced a status
    Error {
        error: TransportErrorKind,
        error_message: String,
    },
}

/// Immutable result of one dispatched request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRecord {
    /// Identifier sent to the target, unique across the whole run
    pub request_id: u64,

    /// Position within the attempt, in `0..concurrency`
    pub sequence: usize,

    /// 1-based attempt index
    pub attempt: u32,

    #[serde(flatten)]
    pub status: OutcomeStatus,

    /// Time from issuing the request to receiving the response (or failing)
    #[serde(serialize_with = "serialize_secs")]
    pub response_time: Duration,

    /// Whether the target accepted the transaction
    pub success: bool,

    /// Completion time
    pub timestamp: DateTime<Utc>,

    /// Parsed response body, or `{"text": ...}` / `{"error": ...}`
    pub response_data: serde_json::Value,

    /// Monotonic instant at which the request was issued, after release and jitter
    #[serde(skip)]
    pub request_started: Instant,
}

impl OutcomeRecord {
    /// HTTP status code, if one was received
    pub const fn status_code(&self) -> Option<u16> {
        match self.status {
            OutcomeStatus::Response { status_code } => Some(status_code),
            OutcomeStatus::Error { .. } => None,
        }
    }

    /// Transport error kind, if the request failed below HTTP
    pub const fn error_kind(&self) -> Option<TransportErrorKind> {
        match self.status {
            OutcomeStatus::Response { .. } => None,
            OutcomeStatus::Error { error, .. } => Some(error),
        }
    }

    /// Key used in the status distribution: the code, or the error kind
    pub fn distribution_key(&self) -> String {
        match &self.status {
            OutcomeStatus::Response { status_code } => status_code.to_string(),
            OutcomeStatus::Error { error, .. } => error.to_string(),
        }
    }
}

/// Assembles an [`OutcomeRecord`] once the request has finished
#[derive(Debug, Clone, Copy)]
pub struct OutcomeContext {
    pub request_id: u64,
    pub sequence: usize,
    pub attempt: u32,
    pub request_started: Instant,
}

impl OutcomeContext {
    pub fn response(
        self,
        status_code: u16,
        body: serde_json::Value,
        policy: &SuccessPolicy,
    ) -> OutcomeRecord {
        OutcomeRecord {
            request_id: self.request_id,
            sequence: self.sequence,
            attempt: self.attempt,
            status: OutcomeStatus::Response { status_code },
            response_time: self.request_started.elapsed(),
            success: policy.is_success(status_code),
            timestamp: Utc::now(),
            response_data: body,
            request_started: self.request_started,
        }
    }

    pub fn error(self, error: &TransportError) -> OutcomeRecord {
        OutcomeRecord {
            request_id: self.request_id,
            sequence: self.sequence,
            attempt: self.attempt,
            status: OutcomeStatus::Error {
                error: error.kind(),
                error_message: error.to_string(),
            },
            response_time: self.request_started.elapsed(),
            success: false,
            timestamp: Utc::now(),
            response_data: serde_json::json!({ "error": error.to_string() }),
            request_started: self.request_started,
        }
    }
}

/// Which status codes count as "the target accepted the transaction"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuccessPolicy {
    statuses: Option<BTreeSet<u16>>,
}

impl SuccessPolicy {
    /// Any 2xx status is a success
    pub const fn any_2xx() -> Self {
        Self { statuses: None }
    }

    /// Exactly the given statuses are successes; an empty list falls back to 2xx
    pub fn from_statuses(statuses: &[u16]) -> Self {
        if statuses.is_empty() {
            Self::any_2xx()
        } else {
            Self {
                statuses: Some(statuses.iter().copied().collect()),
            }
        }
    }

    pub fn is_success(&self, status_code: u16) -> bool {
        self.statuses.as_ref().map_or_else(
            || (200..300).contains(&status_code),
            |set| set.contains(&status_code),
        )
    }
}

fn serialize_secs<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}
