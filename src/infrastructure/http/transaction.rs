use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::trace;

use super::errors::classify_reqwest_error;
use crate::domain::errors::TransportError;
use crate::domain::ports::{TransactionRequest, TransactionTransport, TransportResponse};

/// POSTs transaction requests to the target endpoint
#[derive(Debug, Clone)]
pub struct HttpTransactionTransport {
    client: Client,
    url: String,
    csrf_header: Option<HeaderName>,
}

impl HttpTransactionTransport {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            csrf_header: None,
        }
    }

    /// Echo the request's CSRF token in this header as well as in the body
    ///
    /// Invalid header names are ignored; the token then travels in the body only.
    #[must_use]
    pub fn with_csrf_header(mut self, name: &str) -> Self {
        self.csrf_header = HeaderName::from_bytes(name.as_bytes()).ok();
        self
    }
}

#[async_trait]
impl TransactionTransport for HttpTransactionTransport {
    async fn submit(
        &self,
        request: &TransactionRequest,
    ) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.post(&self.url).json(request);
        if let (Some(name), Some(token)) = (&self.csrf_header, &request.csrf_token) {
            if let Ok(value) = HeaderValue::from_str(token) {
                builder = builder.header(name.clone(), value);
            }
        }

        let response = builder
            .send()
            .await
            .map_err(|err| classify_reqwest_error(&err))?;
        let status = response.status().as_u16();

        // A body that fails mid-read still carries a status worth recording
        let body = match response.bytes().await {
            Ok(bytes) => parse_body(&bytes),
            Err(err) => json!({ "error": classify_reqwest_error(&err).to_string() }),
        };

        trace!(request_id = request.request_id, status, "transaction response");
        Ok(TransportResponse { status, body })
    }
}

/// JSON when possible, otherwise the raw text under `"text"`
pub(crate) fn parse_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| json!({ "text": String::from_utf8_lossy(bytes) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_body() {
        assert_eq!(parse_body(br#"{"ok":true}"#), json!({"ok": true}));
    }

    #[test]
    fn test_parse_text_body() {
        assert_eq!(
            parse_body(b"Conflict: duplicate"),
            json!({"text": "Conflict: duplicate"})
        );
        assert_eq!(parse_body(b""), json!({"text": ""}));
    }

    #[test]
    fn test_invalid_csrf_header_name_is_ignored() {
        let transport = HttpTransactionTransport::new(Client::new(), "http://localhost/")
            .with_csrf_header("bad header");
        assert!(transport.csrf_header.is_none());
    }
}
