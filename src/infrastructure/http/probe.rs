use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::extractor::BalanceExtractor;
use crate::domain::errors::ProbeError;
use crate::domain::models::StateSnapshot;
use crate::domain::ports::StateProbe;
use crate::infrastructure::logging::SecretScrubber;

/// Longest body excerpt quoted in a probe error
const EXCERPT_LEN: usize = 200;

/// Reads the balance from a read-only endpoint with a GET request
#[derive(Debug, Clone)]
pub struct HttpStateProbe {
    client: Client,
    url: String,
    extractor: BalanceExtractor,
}

impl HttpStateProbe {
    pub fn new(client: Client, url: impl Into<String>, extractor: BalanceExtractor) -> Self {
        Self {
            client,
            url: url.into(),
            extractor,
        }
    }
}

#[async_trait]
impl StateProbe for HttpStateProbe {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn capture(&self) -> Result<StateSnapshot, ProbeError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| ProbeError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        let text = response
            .text()
            .await
            .map_err(|err| ProbeError::Request(err.to_string()))?;
        let body: serde_json::Value =
            serde_json::from_str(&text).map_err(|err| ProbeError::InvalidBody(err.to_string()))?;

        let value = self.extractor.extract(&body).ok_or_else(|| {
            let excerpt: String = text.chars().take(EXCERPT_LEN).collect();
            ProbeError::ValueNotFound(format!(
                "looked up {} in {}",
                self.extractor.describe(),
                SecretScrubber::scrub_message(&excerpt)
            ))
        })?;

        debug!(value, "balance read");
        Ok(StateSnapshot::new(value, body))
    }
}
