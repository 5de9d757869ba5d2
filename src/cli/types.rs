//! CLI type definitions
//!
//! The clap command structure and the overrides it contributes to the
//! configuration chain.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "raceprobe")]
#[command(about = "Barrier-synchronized race condition tester for transactional HTTP endpoints")]
#[command(
    long_about = "Fires N identical transaction requests at the same instant and reports \
                  whether more than one was accepted, optionally verifying the balance \
                  before and after every attempt. Only test systems you are authorized to test."
)]
#[command(version)]
pub struct Cli {
    /// Target transaction endpoint URL
    #[arg(short = 'u', long = "url")]
    pub url: Option<String>,

    /// Balance check endpoint URL
    #[arg(short = 'b', long)]
    pub balance_url: Option<String>,

    /// Authentication token
    #[arg(short = 't', long, env = "RACEPROBE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Transaction amount [default: 100.0]
    #[arg(short = 'a', long, allow_negative_numbers = true)]
    pub amount: Option<f64>,

    /// Number of concurrent requests [default: 50]
    #[arg(short = 'c', long = "concurrent")]
    pub concurrent: Option<usize>,

    /// Request timeout in seconds [default: 10]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Proxy URL (e.g. http://127.0.0.1:8080)
    #[arg(long)]
    pub proxy: Option<String>,

    /// Number of race attempts [default: 1]
    #[arg(long = "retry")]
    pub retry: Option<u32>,

    /// Random delay after release in milliseconds [default: 0]
    #[arg(long)]
    pub jitter: Option<u64>,

    /// Verify balance changes
    #[arg(long)]
    pub verify_balance: bool,

    /// Output file for the JSON report [default: race_test_<timestamp>.json]
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// YAML configuration file [default: .raceprobe.yaml if present]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the analysis as JSON instead of the human report
    #[arg(long)]
    pub json: bool,
}

/// Flags given on the command line, in configuration field names
///
/// Absent flags are skipped when serialized so lower layers keep their values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jitter_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_balance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            target_url: self.url.clone(),
            balance_url: self.balance_url.clone(),
            auth_token: self.token.clone(),
            amount: self.amount,
            concurrency: self.concurrent,
            timeout_secs: self.timeout,
            proxy: self.proxy.clone(),
            attempts: self.retry,
            jitter_ms: self.jitter,
            // A bare flag can only switch verification on
            verify_balance: self.verify_balance.then_some(true),
            output: self.output.clone(),
        }
    }
}
