use std::collections::BTreeMap;

use crate::domain::models::{
    AnalysisVerdict, AttemptResult, AttemptVerdict, BalanceVerification, ExpectedChange,
    ResponseTimeStats, RunState, Severity, SnapshotPair, TestConfig,
};

/// Severity plus the sentence explaining it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub severity: Severity,
    pub explanation: String,
}

/// Classify one attempt from its success count and optional balance delta
///
/// A balance delta beyond the expected change (in the direction of the
/// expected change) is CRITICAL and wins over status codes; otherwise more
/// than one success is HIGH; anything else is NONE.
pub fn classify(
    success_count: usize,
    balance_delta: Option<f64>,
    expected_delta: f64,
    tolerance: f64,
) -> Classification {
    if let Some(delta) = balance_delta {
        let exceeded = if expected_delta < 0.0 {
            delta < expected_delta - tolerance
        } else {
            delta > expected_delta + tolerance
        };
        if exceeded {
            return Classification {
                severity: Severity::Critical,
                explanation: format!(
                    "Balance changed by {delta} (expected {expected_delta}). Multiple transactions processed!"
                ),
            };
        }
    }

    match success_count {
        0 => Classification {
            severity: Severity::None,
            explanation: "No request succeeded; the attempt produced no evidence of a race"
                .to_string(),
        },
        1 => Classification {
            severity: Severity::None,
            explanation: "Exactly one request succeeded; the target serialized the transactions"
                .to_string(),
        },
        n => Classification {
            severity: Severity::High,
            explanation: format!(
                "Multiple concurrent transactions succeeded: {n} where at most 1 was expected"
            ),
        },
    }
}

/// Turns attempt results into verdicts
///
/// Holds no mutable state: analyzing the same run twice yields the same verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictAnalyzer {
    amount: f64,
    expected_change: ExpectedChange,
    tolerance: f64,
}

impl VerdictAnalyzer {
    /// Analyzer expecting `amount × 1` per accepted transaction, exact comparison
    pub fn new(amount: f64) -> Self {
        Self {
            amount,
            expected_change: ExpectedChange::default(),
            tolerance: 0.0,
        }
    }

    pub fn from_config(config: &TestConfig) -> Self {
        Self {
            amount: config.amount,
            expected_change: config.expected_change,
            tolerance: config.tolerance,
        }
    }

    #[must_use]
    pub const fn with_expected_change(mut self, expected_change: ExpectedChange) -> Self {
        self.expected_change = expected_change;
        self
    }

    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Expected balance change of one attempt
    pub fn expected_delta(&self) -> f64 {
        self.expected_change.expected(self.amount)
    }

    pub fn analyze_attempt(&self, attempt: &AttemptResult) -> AttemptVerdict {
        let successful = attempt.success_count();
        let expected = self.expected_delta();
        let balance_verification = attempt.snapshots.as_ref().map(|pair| {
            BalanceVerification::new(pair.before.value, pair.after.value, expected, self.tolerance)
        });

        let Classification {
            severity,
            explanation,
        } = classify(
            successful,
            balance_verification.map(|bv| bv.change),
            expected,
            self.tolerance,
        );

        AttemptVerdict {
            attempt: attempt.attempt,
            total: attempt.records.len(),
            successful,
            failed: attempt.records.len() - successful,
            pending: attempt.pending_request_ids.len(),
            severity,
            race_detected: severity.is_finding(),
            balance_verification,
            explanation,
            degraded: attempt.degraded,
        }
    }

    /// Aggregate verdict: counts over all records, severity = worst attempt
    pub fn analyze(&self, state: &RunState) -> AnalysisVerdict {
        let attempts: Vec<AttemptVerdict> = state
            .attempts
            .iter()
            .map(|attempt| self.analyze_attempt(attempt))
            .collect();

        let total_requests = state.records().count();
        let successful_requests = state.records().filter(|r| r.success).count();
        let pending_requests = state.attempts.iter().map(|a| a.pending_request_ids.len()).sum();

        let mut status_code_distribution = BTreeMap::new();
        for record in state.records() {
            *status_code_distribution
                .entry(record.distribution_key())
                .or_insert(0) += 1;
        }

        let worst = attempts
            .iter()
            .filter(|verdict| verdict.severity.is_finding())
            .max_by(|a, b| a.severity.cmp(&b.severity).then(b.attempt.cmp(&a.attempt)));
        let (severity, explanation) = match worst {
            Some(verdict) if attempts.len() > 1 => (
                verdict.severity,
                format!("Attempt {}: {}", verdict.attempt, verdict.explanation),
            ),
            Some(verdict) => (verdict.severity, verdict.explanation.clone()),
            None => match attempts.as_slice() {
                [] => (Severity::None, "No attempts were run".to_string()),
                [only] => (Severity::None, only.explanation.clone()),
                _ => (
                    Severity::None,
                    format!("No race observed in {} attempts", attempts.len()),
                ),
            },
        };

        AnalysisVerdict {
            total_requests,
            successful_requests,
            failed_requests: total_requests - successful_requests,
            pending_requests,
            success_rate: if total_requests == 0 {
                0.0
            } else {
                successful_requests as f64 / total_requests as f64 * 100.0
            },
            response_times: response_time_stats(state),
            status_code_distribution,
            balance_verification: self.aggregate_balance(state),
            race_detected: severity.is_finding(),
            severity,
            explanation,
            warnings: warnings(state),
            attempts,
        }
    }

    /// First verified "before" against last verified "after"
    ///
    /// Unverified attempts between them still move the balance, so the
    /// expected change covers every attempt in that span.
    fn aggregate_balance(&self, state: &RunState) -> Option<BalanceVerification> {
        let verified: Vec<(usize, &SnapshotPair)> = state
            .attempts
            .iter()
            .enumerate()
            .filter_map(|(idx, attempt)| attempt.snapshots.as_ref().map(|pair| (idx, pair)))
            .collect();
        let &(first_idx, first) = verified.first()?;
        let &(last_idx, last) = verified.last()?;
        let spanned = last_idx - first_idx + 1;

        Some(BalanceVerification::new(
            first.before.value,
            last.after.value,
            self.expected_delta() * spanned as f64,
            self.tolerance,
        ))
    }
}

fn response_time_stats(state: &RunState) -> ResponseTimeStats {
    let times: Vec<f64> = state
        .records()
        .map(|r| r.response_time.as_secs_f64())
        .collect();
    if times.is_empty() {
        return ResponseTimeStats::default();
    }

    ResponseTimeStats {
        avg: times.iter().sum::<f64>() / times.len() as f64,
        min: times.iter().copied().fold(f64::INFINITY, f64::min),
        max: times.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

fn warnings(state: &RunState) -> Vec<String> {
    let mut warnings = Vec::new();
    for attempt in &state.attempts {
        for note in &attempt.notes {
            warnings.push(format!("attempt {}: {note}", attempt.attempt));
        }
        if attempt.success_count() == 0 {
            warnings.push(format!(
                "attempt {}: no request succeeded; check the credential, amount and target before trusting this result",
                attempt.attempt
            ));
        }
    }
    warnings
}
