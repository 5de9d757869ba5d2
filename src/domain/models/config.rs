use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Resolved configuration for one race test run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct TestConfig {
    /// Transaction endpoint under test
    #[serde(default)]
    pub target_url: String,

    /// Endpoint returning the balance/state value, if any
    #[serde(default)]
    pub balance_url: Option<String>,

    /// Bearer credential sent with every request
    #[serde(default)]
    pub auth_token: String,

    /// Amount carried by every transaction request
    #[serde(default = "default_amount")]
    pub amount: f64,

    /// Number of simultaneous requests per attempt
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Proxy all traffic is routed through
    #[serde(default)]
    pub proxy: Option<String>,

    /// Number of sequential race attempts
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Upper bound of the random post-release delay, in milliseconds
    #[serde(default)]
    pub jitter_ms: u64,

    /// Capture balance snapshots around every attempt
    #[serde(default)]
    pub verify_balance: bool,

    /// Report file path
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Status codes counted as an accepted transaction (empty = any 2xx)
    #[serde(default)]
    pub success_statuses: Vec<u16>,

    /// Field names searched, in order, for the balance value
    #[serde(default = "default_balance_fields")]
    pub balance_fields: Vec<String>,

    /// JSON pointer to the balance value; takes precedence over `balance_fields`
    #[serde(default)]
    pub balance_pointer: Option<String>,

    /// Body fields searched for a CSRF token
    #[serde(default = "default_csrf_fields")]
    pub csrf_fields: Vec<String>,

    /// Response header searched for a CSRF token
    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,

    /// Balance change one accepted transaction should produce
    #[serde(default)]
    pub expected_change: ExpectedChange,

    /// Allowed excess of the observed balance change over the expected one
    #[serde(default)]
    pub tolerance: f64,

    /// Margin added to the per-request timeout before an attempt is cut off
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,

    /// Pause before the "after" snapshot so the target can settle
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Pause between attempts
    #[serde(default = "default_attempt_interval_ms")]
    pub attempt_interval_ms: u64,

    /// Permit zero or negative amounts (amount abuse testing)
    #[serde(default)]
    pub allow_non_positive_amount: bool,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

const fn default_amount() -> f64 {
    100.0
}

const fn default_concurrency() -> usize {
    50
}

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_attempts() -> u32 {
    1
}

fn default_balance_fields() -> Vec<String> {
    ["balance", "amount", "available_balance", "current_balance"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_csrf_fields() -> Vec<String> {
    ["csrf_token", "token", "csrfToken", "_token", "csrf"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_csrf_header() -> String {
    "X-CSRF-Token".to_string()
}

const fn default_grace_ms() -> u64 {
    2000
}

const fn default_settle_ms() -> u64 {
    1000
}

const fn default_attempt_interval_ms() -> u64 {
    500
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            balance_url: None,
            auth_token: String::new(),
            amount: default_amount(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
            proxy: None,
            attempts: default_attempts(),
            jitter_ms: 0,
            verify_balance: false,
            output: None,
            success_statuses: Vec::new(),
            balance_fields: default_balance_fields(),
            balance_pointer: None,
            csrf_fields: default_csrf_fields(),
            csrf_header: default_csrf_header(),
            expected_change: ExpectedChange::default(),
            tolerance: 0.0,
            grace_ms: default_grace_ms(),
            settle_ms: default_settle_ms(),
            attempt_interval_ms: default_attempt_interval_ms(),
            allow_non_positive_amount: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl TestConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    /// How long after release an attempt may run before unfinished tasks are abandoned
    pub fn attempt_deadline(&self) -> Duration {
        self.jitter() + self.request_timeout() + Duration::from_millis(self.grace_ms)
    }

    /// Whether snapshots should be taken around each attempt
    pub fn balance_checks_enabled(&self) -> bool {
        self.verify_balance && self.balance_url.is_some()
    }
}

/// How much the observed state should move when exactly one transaction is accepted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExpectedChange {
    /// `amount × multiplier`
    PerTransaction { multiplier: f64 },
    /// A constant change independent of the amount
    Fixed { value: f64 },
}

impl Default for ExpectedChange {
    fn default() -> Self {
        Self::PerTransaction { multiplier: 1.0 }
    }
}

impl ExpectedChange {
    /// Expected state delta for a single accepted transaction of `amount`
    pub fn expected(&self, amount: f64) -> f64 {
        match *self {
            Self::PerTransaction { multiplier } => amount * multiplier,
            Self::Fixed { value } => value,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling JSON log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation of file logs: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
