use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::models::TestConfig;
use crate::domain::ports::TokenSource;

/// Fetches an anti-CSRF token with a GET to the transaction endpoint
///
/// Body fields are searched first, then the response header. Any failure
/// means the target hands out no token.
#[derive(Debug, Clone)]
pub struct HttpTokenSource {
    client: Client,
    url: String,
    fields: Vec<String>,
    header: String,
}

impl HttpTokenSource {
    pub fn new(client: Client, config: &TestConfig) -> Self {
        Self {
            client,
            url: config.target_url.clone(),
            fields: config.csrf_fields.clone(),
            header: config.csrf_header.clone(),
        }
    }

    fn token_from_body(&self, body: &Value) -> Option<String> {
        self.fields.iter().find_map(|field| match body.get(field)? {
            Value::String(token) if !token.is_empty() => Some(token.clone()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch_token(&self) -> Option<String> {
        let response = match self.client.get(&self.url).send().await {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err, "CSRF token request failed; continuing without token");
                return None;
            }
        };

        let header_token = response
            .headers()
            .get(self.header.as_str())
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let body_token = match response.json::<Value>().await {
            Ok(body) => self.token_from_body(&body),
            Err(err) => {
                debug!(error = %err, "CSRF response is not JSON");
                None
            }
        };

        let token = body_token.or(header_token);
        debug!(found = token.is_some(), "CSRF token lookup finished");
        token
    }
}
