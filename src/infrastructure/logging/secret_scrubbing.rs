use regex::{Captures, Regex};
use std::sync::LazyLock;

static BEARER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Bearer\s+[a-zA-Z0-9\-_\.~+/=]+").expect("valid regex")
});

// Token-like fields in JSON, YAML or query strings
static TOKEN_FIELD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(["']?(?:auth_token|access_token|api_key|apikey|token|secret|password|csrf_token)["']?\s*[:=]\s*)["']?[^"'\s,&}]+["']?"#,
    )
    .expect("valid regex")
});

/// Redacts credentials from text before it reaches logs, the terminal or the report
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretScrubber;

impl SecretScrubber {
    pub const REDACTED: &'static str = "[REDACTED]";

    /// Scrub a message of bearer tokens and token-like fields
    pub fn scrub_message(message: &str) -> String {
        let scrubbed = BEARER_PATTERN.replace_all(message, "Bearer [TOKEN_REDACTED]");
        TOKEN_FIELD_PATTERN
            .replace_all(&scrubbed, |caps: &Captures| {
                format!("{}{}", &caps[1], Self::REDACTED)
            })
            .into_owned()
    }

    /// Mask a credential value entirely, keeping only whether one was set
    pub fn redact_credential(credential: &str) -> String {
        if credential.is_empty() {
            String::new()
        } else {
            Self::REDACTED.to_string()
        }
    }
}
