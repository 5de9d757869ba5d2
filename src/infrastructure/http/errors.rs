use thiserror::Error;

use crate::domain::errors::TransportError;

/// Errors raised while building the shared HTTP client
#[derive(Error, Debug)]
pub enum HttpSetupError {
    /// Proxy URL rejected by reqwest
    #[error("Invalid proxy {0}: {1}")]
    InvalidProxy(String, #[source] reqwest::Error),

    /// Credential cannot be carried in an HTTP header
    #[error("Authentication token contains characters not allowed in a header")]
    InvalidToken,

    /// TLS backend or resolver initialization failed
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Map a reqwest failure onto the transport error taxonomy
///
/// Timeouts and connection failures are kept apart from everything else so
/// the report can tell a slow target from an unreachable one.
pub fn classify_reqwest_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection(root_cause(err))
    } else if err.is_body() || err.is_decode() {
        TransportError::Body(root_cause(err))
    } else {
        TransportError::Request(root_cause(err))
    }
}

// reqwest's Display hides the interesting part (refused, dns, tls) in the source chain
fn root_cause(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message = format!("{message}: {cause}");
        source = cause.source();
    }
    message
}
