use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::errors::{ProbeError, TransportError};
use crate::domain::models::StateSnapshot;

/// One transaction submitted to the target
///
/// Serialized as the JSON body of the request.
///
/// # Example
/// ```
/// use raceprobe::domain::ports::TransactionRequest;
///
/// let request = TransactionRequest::new(7, 100.0, None);
/// let body = serde_json::to_value(&request).unwrap();
/// assert_eq!(body["request_id"], 7);
/// assert_eq!(body["transaction_type"], "transfer");
/// assert!(body.get("csrf_token").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRequest {
    pub amount: f64,
    pub transaction_type: &'static str,
    pub request_id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
}

impl TransactionRequest {
    pub fn new(request_id: u64, amount: f64, csrf_token: Option<String>) -> Self {
        Self {
            amount,
            transaction_type: "transfer",
            request_id,
            timestamp: Utc::now(),
            csrf_token,
        }
    }
}

/// What the target answered
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    /// Parsed JSON body, or `{"text": ...}` when the body is not JSON
    pub body: serde_json::Value,
}

/// Sends transaction requests to the target operation
///
/// Implementations share one connection pool and session across all calls and
/// must not serialize concurrent calls.
#[async_trait]
pub trait TransactionTransport: Send + Sync {
    /// Submit a single transaction and wait for the response
    async fn submit(&self, request: &TransactionRequest)
        -> Result<TransportResponse, TransportError>;
}

/// Reads the target's balance/state value without side effects
#[async_trait]
pub trait StateProbe: Send + Sync {
    async fn capture(&self) -> Result<StateSnapshot, ProbeError>;
}

/// Retrieves an anti-CSRF token to include in transaction requests
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// `None` when the target does not hand out a token
    async fn fetch_token(&self) -> Option<String>;
}
