use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::models::TestConfig;

/// Project-local config file picked up when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = ".raceprobe.yaml";

/// Prefix of environment variable overrides (`RACEPROBE_LOGGING__LEVEL=debug`)
pub const ENV_PREFIX: &str = "RACEPROBE_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Target URL is required (use --url)")]
    MissingTargetUrl,

    #[error("Invalid target URL: {0}. Must be an http:// or https:// URL")]
    InvalidTargetUrl(String),

    #[error("Authentication token is required (use --token or RACEPROBE_TOKEN)")]
    MissingToken,

    #[error("Invalid concurrency: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    #[error("Invalid timeout: {0}s. Must be positive")]
    InvalidTimeout(u64),

    #[error("Invalid attempts: {0}. Must be at least 1")]
    InvalidAttempts(u32),

    #[error("Invalid amount: {0}. Must be positive (set allow_non_positive_amount to test amount abuse)")]
    InvalidAmount(f64),

    #[error("Invalid tolerance: {0}. Must be a finite value >= 0")]
    InvalidTolerance(f64),

    #[error("Balance verification requires a balance URL (use --balance-url)")]
    MissingBalanceUrl,

    #[error("Invalid balance URL: {0}. Must be an http:// or https:// URL")]
    InvalidBalanceUrl(String),

    #[error("Invalid proxy URL: {0}")]
    InvalidProxy(String),

    #[error("Invalid balance pointer: {0}. Must be empty or start with '/'")]
    InvalidBalancePointer(String),

    #[error("Invalid success status: {0}. Must be between 100 and 599")]
    InvalidSuccessStatus(u16),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to extract configuration: {0}")]
    Extract(#[from] Box<figment::Error>),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. YAML config file (`file`, or `.raceprobe.yaml` when present)
    /// 3. Environment variables (RACEPROBE_* prefix, `__` separates nesting)
    /// 4. Command line overrides (absent flags must be skipped when serialized)
    pub fn load<O: Serialize>(file: Option<&Path>, overrides: &O) -> Result<TestConfig, ConfigError> {
        let config = Self::figment(file, overrides)?
            .extract::<TestConfig>()
            .map_err(Box::new)?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Build the merged provider chain without extracting
    pub fn figment<O: Serialize>(file: Option<&Path>, overrides: &O) -> Result<Figment, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(TestConfig::default()));

        match file {
            // An explicit file must exist; the implicit one is optional
            Some(path) if !path.exists() => {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            Some(path) => figment = figment.merge(Yaml::file(path)),
            None => figment = figment.merge(Yaml::file(DEFAULT_CONFIG_FILE)),
        }

        Ok(figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides)))
    }

    /// Validate configuration after loading
    pub fn validate(config: &TestConfig) -> Result<(), ConfigError> {
        // Validate target
        if config.target_url.trim().is_empty() {
            return Err(ConfigError::MissingTargetUrl);
        }
        if !is_http_url(&config.target_url) {
            return Err(ConfigError::InvalidTargetUrl(config.target_url.clone()));
        }

        if config.auth_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }

        // Validate dispatch shape
        if config.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(config.concurrency));
        }
        if config.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.timeout_secs));
        }
        if config.attempts == 0 {
            return Err(ConfigError::InvalidAttempts(config.attempts));
        }

        if !config.amount.is_finite() || (config.amount <= 0.0 && !config.allow_non_positive_amount)
        {
            return Err(ConfigError::InvalidAmount(config.amount));
        }

        if !config.tolerance.is_finite() || config.tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(config.tolerance));
        }

        // Validate balance verification
        match &config.balance_url {
            Some(url) if !is_http_url(url) => {
                return Err(ConfigError::InvalidBalanceUrl(url.clone()));
            }
            None if config.verify_balance => return Err(ConfigError::MissingBalanceUrl),
            _ => {}
        }

        if let Some(pointer) = &config.balance_pointer {
            if !pointer.is_empty() && !pointer.starts_with('/') {
                return Err(ConfigError::InvalidBalancePointer(pointer.clone()));
            }
        }

        if let Some(&status) = config
            .success_statuses
            .iter()
            .find(|status| !(100..=599).contains(*status))
        {
            return Err(ConfigError::InvalidSuccessStatus(status));
        }

        if let Some(proxy) = &config.proxy {
            if reqwest::Proxy::all(proxy.as_str()).is_err() {
                return Err(ConfigError::InvalidProxy(proxy.clone()));
            }
        }

        // Validate logging config
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        Ok(())
    }
}

fn is_http_url(candidate: &str) -> bool {
    reqwest::Url::parse(candidate)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}
