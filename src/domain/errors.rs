//! Domain errors for the race testing engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Coarse classification of a request that never produced an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// The per-request timeout elapsed
    Timeout,
    /// Connection refused, reset, DNS failure, TLS failure
    Connection,
    /// The request could not be built or sent
    Request,
    /// The response body could not be read
    Body,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::Request => "request",
            Self::Body => "body",
        };
        f.write_str(label)
    }
}

/// Network-level failure of a single transaction request.
///
/// Always captured as an outcome record by the dispatcher, never propagated.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

impl TransportError {
    pub const fn kind(&self) -> TransportErrorKind {
        match self {
            Self::Timeout => TransportErrorKind::Timeout,
            Self::Connection(_) => TransportErrorKind::Connection,
            Self::Request(_) => TransportErrorKind::Request,
            Self::Body(_) => TransportErrorKind::Body,
        }
    }
}

/// Failure to capture a state snapshot.
///
/// Disables balance analysis for the affected attempt only.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProbeError {
    #[error("balance request failed: {0}")]
    Request(String),

    #[error("balance endpoint returned HTTP {0}")]
    Status(u16),

    #[error("balance response is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("no numeric balance found in response: {0}")]
    ValueNotFound(String),
}

/// Misuse or failure of the release barrier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BarrierError {
    #[error("a barrier needs at least one participant")]
    NoParticipants,

    #[error("barrier was already released")]
    AlreadyReleased,

    #[error("only {arrived} of {expected} participants reached the barrier")]
    ParticipantsMissing { arrived: usize, expected: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_kinds() {
        assert_eq!(TransportError::Timeout.kind(), TransportErrorKind::Timeout);
        assert_eq!(
            TransportError::Connection("refused".into()).kind(),
            TransportErrorKind::Connection
        );
        assert_eq!(
            TransportError::Request("bad url".into()).kind(),
            TransportErrorKind::Request
        );
        assert_eq!(TransportError::Body("eof".into()).kind(), TransportErrorKind::Body);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&TransportErrorKind::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
        assert_eq!(TransportErrorKind::Connection.to_string(), "connection");
    }

    #[test]
    fn test_barrier_error_message() {
        let err = BarrierError::ParticipantsMissing {
            arrived: 3,
            expected: 5,
        };
        assert_eq!(err.to_string(), "only 3 of 5 participants reached the barrier");
    }
}
