use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy};
use std::time::Duration;
use tracing::debug;

use super::errors::HttpSetupError;
use crate::domain::models::TestConfig;

/// Settings of the shared HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub auth_token: String,
    pub timeout: Duration,
    /// Idle connections kept per host; at least the concurrency width
    pub pool_per_host: usize,
    pub proxy: Option<String>,
}

impl From<&TestConfig> for HttpClientConfig {
    fn from(config: &TestConfig) -> Self {
        Self {
            auth_token: config.auth_token.clone(),
            timeout: config.request_timeout(),
            pool_per_host: config.concurrency,
            proxy: config.proxy.clone(),
        }
    }
}

/// Build the one client shared by the transport, the probe and the token source
///
/// Carries the bearer credential as a default header and keeps a cookie jar
/// so session cookies set by the target apply to every request. The pool has
/// no global cap, so N requests can be in flight on N connections.
pub fn build_http_client(config: &HttpClientConfig) -> Result<Client, HttpSetupError> {
    let mut authorization = HeaderValue::from_str(&format!("Bearer {}", config.auth_token))
        .map_err(|_| HttpSetupError::InvalidToken)?;
    authorization.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, authorization);
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

    let mut builder = Client::builder()
        .default_headers(headers)
        .timeout(config.timeout)
        .pool_max_idle_per_host(config.pool_per_host.max(1))
        .tcp_nodelay(true) // Disable Nagle's algorithm for lower latency
        .cookie_store(true)
        .user_agent(concat!("raceprobe/", env!("CARGO_PKG_VERSION")));

    if let Some(proxy) = &config.proxy {
        let proxy = Proxy::all(proxy.as_str())
            .map_err(|err| HttpSetupError::InvalidProxy(proxy.clone(), err))?;
        builder = builder.proxy(proxy);
    }

    debug!(
        pool_per_host = config.pool_per_host,
        timeout_ms = config.timeout.as_millis(),
        proxied = config.proxy.is_some(),
        "building HTTP client"
    );
    Ok(builder.build()?)
}
