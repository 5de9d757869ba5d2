//! Table output formatting for the race report
//!
//! Uses comfy-table; color-coded severity cells unless `NO_COLOR` is set or
//! the terminal is dumb.

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use std::collections::BTreeMap;
use std::env;

use crate::domain::models::{AttemptVerdict, Severity};

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    pub const fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Status code (or error kind) distribution
    pub fn format_status_distribution(
        &self,
        distribution: &BTreeMap<String, usize>,
        total: usize,
    ) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Count").add_attribute(Attribute::Bold),
            Cell::new("Share").add_attribute(Attribute::Bold),
        ]);

        for (status, count) in distribution {
            let share = if total == 0 {
                0.0
            } else {
                *count as f64 / total as f64 * 100.0
            };
            let status_cell = if self.use_colors {
                Cell::new(status).fg(status_color(status))
            } else {
                Cell::new(status)
            };
            table.add_row(vec![
                status_cell,
                Cell::new(count).set_alignment(CellAlignment::Right),
                Cell::new(format!("{share:.1}%")).set_alignment(CellAlignment::Right),
            ]);
        }

        table.to_string()
    }

    /// One row per attempt
    pub fn format_attempts(&self, attempts: &[AttemptVerdict]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Attempt").add_attribute(Attribute::Bold),
            Cell::new("Collected").add_attribute(Attribute::Bold),
            Cell::new("Successful").add_attribute(Attribute::Bold),
            Cell::new("Pending").add_attribute(Attribute::Bold),
            Cell::new("Balance Δ").add_attribute(Attribute::Bold),
            Cell::new("Severity").add_attribute(Attribute::Bold),
        ]);

        for verdict in attempts {
            let balance = verdict.balance_verification.map_or_else(
                || "-".to_string(),
                |bv| format!("{:+} (exp {:+})", bv.change, bv.expected_change),
            );
            let attempt = if verdict.degraded {
                format!("{} (degraded)", verdict.attempt)
            } else {
                verdict.attempt.to_string()
            };
            table.add_row(vec![
                Cell::new(attempt),
                Cell::new(verdict.total).set_alignment(CellAlignment::Right),
                Cell::new(verdict.successful).set_alignment(CellAlignment::Right),
                Cell::new(verdict.pending).set_alignment(CellAlignment::Right),
                Cell::new(balance),
                self.severity_cell(verdict.severity),
            ]);
        }

        table.to_string()
    }

    fn severity_cell(&self, severity: Severity) -> Cell {
        let cell = Cell::new(severity);
        if self.use_colors {
            cell.fg(severity_color(severity))
                .add_attribute(Attribute::Bold)
        } else {
            cell
        }
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        // Use UTF-8 preset for nice borders
        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if !self.use_colors {
            table.force_no_tty();
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
pub fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    // Check for dumb terminal
    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

const fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::None => Color::Green,
        Severity::Low => Color::Cyan,
        Severity::Medium => Color::Yellow,
        Severity::High | Severity::Critical => Color::Red,
    }
}

fn status_color(status: &str) -> Color {
    match status.as_bytes().first() {
        Some(b'2') => Color::Green,
        Some(b'4') => Color::Yellow,
        Some(b'5') => Color::Red,
        Some(b'0'..=b'9') => Color::White,
        // Transport error kinds
        _ => Color::DarkGrey,
    }
}
