use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Ordered impact classification of a race condition finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub const fn is_finding(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed versus expected state change
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalanceVerification {
    pub before: f64,
    pub after: f64,
    pub change: f64,
    pub expected_change: f64,
    pub unexpected_change: bool,
}

impl BalanceVerification {
    pub fn new(before: f64, after: f64, expected_change: f64, tolerance: f64) -> Self {
        let change = after - before;
        Self {
            before,
            after,
            change,
            expected_change,
            unexpected_change: (change - expected_change).abs() > tolerance,
        }
    }
}

/// Response time summary in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ResponseTimeStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Verdict for a single attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptVerdict {
    pub attempt: u32,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub pending: usize,
    pub severity: Severity,
    pub race_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_verification: Option<BalanceVerification>,
    pub explanation: String,
    pub degraded: bool,
}

/// Aggregate verdict of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisVerdict {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub pending_requests: usize,
    pub success_rate: f64,
    pub response_times: ResponseTimeStats,
    pub status_code_distribution: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_verification: Option<BalanceVerification>,
    pub race_detected: bool,
    pub severity: Severity,
    pub explanation: String,
    pub warnings: Vec<String>,
    pub attempts: Vec<AttemptVerdict>,
}
