//! Output formatting utilities for the CLI.

pub mod progress;
pub mod table;

use console::{style, Style};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::domain::models::{AnalysisVerdict, Severity};
use table::{supports_color, TableFormatter};

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}

/// What the `run` command prints once the analysis is done
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub target_url: &'a str,
    pub amount: f64,
    pub concurrency: usize,
    pub analysis: &'a AnalysisVerdict,
    pub report_path: Option<PathBuf>,
}

impl CommandOutput for RunSummary<'_> {
    fn to_human(&self) -> String {
        let colors = supports_color();
        let heading = |text: &str| {
            if colors {
                style(text).bold().to_string()
            } else {
                text.to_string()
            }
        };
        let analysis = self.analysis;
        let mut out = String::new();

        let rule = "=".repeat(60);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{}", heading("RACE CONDITION TEST RESULTS"));
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Target:              {}", self.target_url);
        let _ = writeln!(
            out,
            "Amount:              {} x {} concurrent",
            self.amount, self.concurrency
        );
        let _ = writeln!(out, "Total Requests:      {}", analysis.total_requests);
        let _ = writeln!(out, "Successful:          {}", analysis.successful_requests);
        let _ = writeln!(out, "Failed:              {}", analysis.failed_requests);
        if analysis.pending_requests > 0 {
            let _ = writeln!(out, "Pending (aborted):   {}", analysis.pending_requests);
        }
        let _ = writeln!(out, "Success Rate:        {:.2}%", analysis.success_rate);
        let _ = writeln!(
            out,
            "Response Time:       avg {:.3}s  min {:.3}s  max {:.3}s",
            analysis.response_times.avg, analysis.response_times.min, analysis.response_times.max
        );

        if !analysis.status_code_distribution.is_empty() {
            let _ = writeln!(out, "\n{}", heading("Status Code Distribution"));
            let _ = writeln!(
                out,
                "{}",
                TableFormatter::with_colors(colors).format_status_distribution(
                    &analysis.status_code_distribution,
                    analysis.total_requests
                )
            );
        }

        if analysis.attempts.len() > 1 {
            let _ = writeln!(out, "\n{}", heading("Attempts"));
            let _ = writeln!(
                out,
                "{}",
                TableFormatter::with_colors(colors).format_attempts(&analysis.attempts)
            );
        }

        if let Some(bv) = analysis.balance_verification {
            let _ = writeln!(out, "\n{}", heading("Balance Verification"));
            let _ = writeln!(out, "  Before:          {}", bv.before);
            let _ = writeln!(out, "  After:           {}", bv.after);
            let _ = writeln!(out, "  Change:          {}", bv.change);
            let _ = writeln!(out, "  Expected Change: {}", bv.expected_change);
            let _ = writeln!(
                out,
                "  Unexpected:      {}",
                if bv.unexpected_change { "YES" } else { "no" }
            );
        }

        let _ = writeln!(out, "\n{rule}");
        let verdict_style = if colors {
            severity_style(analysis.severity)
        } else {
            Style::new()
        };
        if analysis.race_detected {
            let _ = writeln!(
                out,
                "{}",
                verdict_style.apply_to(format!(
                    "RACE CONDITION DETECTED! Severity: {}",
                    analysis.severity
                ))
            );
        } else {
            let _ = writeln!(
                out,
                "{}",
                verdict_style.apply_to(format!("No race condition detected (severity: {})", analysis.severity))
            );
        }
        let _ = writeln!(out, "{}", analysis.explanation);

        for warning in &analysis.warnings {
            let line = format!("warning: {warning}");
            let _ = writeln!(
                out,
                "{}",
                if colors { style(line).yellow().to_string() } else { line }
            );
        }
        let _ = write!(out, "{rule}");

        if let Some(path) = &self.report_path {
            let _ = write!(out, "\nResults saved to: {}", path.display());
        }

        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::None => Style::new().green().bold(),
        Severity::Low => Style::new().cyan().bold(),
        Severity::Medium => Style::new().yellow().bold(),
        Severity::High | Severity::Critical => Style::new().red().bold(),
    }
}
