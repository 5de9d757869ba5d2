//! Raceprobe CLI entry point.

use clap::Parser;

use raceprobe::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = raceprobe::cli::commands::execute(cli).await {
        raceprobe::cli::handle_error(&err, json);
    }
}
