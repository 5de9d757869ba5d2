//! Command-line interface
//!
//! Argument parsing, the run command, terminal output and the JSON report.

pub mod commands;
pub mod output;
pub mod report;
pub mod types;

pub use types::{Cli, ConfigOverrides};

use crate::infrastructure::logging::SecretScrubber;

/// Print a fatal error (plain or JSON) and exit with status 1
pub fn handle_error(err: &anyhow::Error, json: bool) -> ! {
    let message = SecretScrubber::scrub_message(&format!("{err:#}"));
    if json {
        println!("{}", serde_json::json!({ "error": message }));
    } else {
        eprintln!("{} {message}", console::style("Error:").red().bold());
    }
    std::process::exit(1)
}
