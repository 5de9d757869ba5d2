//! The race test command: composition root of the engine and its adapters

use anyhow::{Context, Result};
use chrono::Local;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::{
    AttemptOrchestrator, ConcurrentDispatcher, DispatchSettings, OrchestratorSettings,
};
use crate::cli::output::progress::{create_spinner, ProgressBarExt};
use crate::cli::output::{output, RunSummary};
use crate::cli::report::{default_report_path, RunReport};
use crate::cli::types::Cli;
use crate::domain::models::{AnalysisVerdict, AttemptResult, RunState, SuccessPolicy, TestConfig};
use crate::domain::ports::TokenSource;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::http::{
    build_http_client, BalanceExtractor, HttpClientConfig, HttpStateProbe, HttpTokenSource,
    HttpTransactionTransport,
};
use crate::infrastructure::logging::{LogConfig, LogFormat, LoggerImpl};
use crate::services::VerdictAnalyzer;

/// Logging settings for this run; `--json` switches console logs to JSON too
fn log_config(config: &TestConfig, json_mode: bool) -> LogConfig {
    let log_config = LogConfig::from(&config.logging);
    if json_mode {
        log_config.with_format(LogFormat::Json)
    } else {
        log_config
    }
}

/// Load configuration, run every attempt, print the verdict and write the report
pub async fn execute(cli: Cli) -> Result<()> {
    let config = ConfigLoader::load(cli.config.as_deref(), &cli.overrides())
        .context("Invalid configuration")?;

    let _logger = LoggerImpl::init(&log_config(&config, cli.json))
        .context("Failed to initialize logging")?;

    let spinner = create_spinner(cli.json);
    spinner.set_message(format!(
        "Racing {} concurrent requests against {}",
        config.concurrency, config.target_url
    ));

    let total = config.attempts;
    let (state, analysis) = run_test(&config, |attempt: &AttemptResult| {
        spinner.set_message(format!(
            "attempt {}/{}: {} of {} accepted",
            attempt.attempt,
            total,
            attempt.success_count(),
            attempt.width
        ));
    })
    .await?;

    if analysis.race_detected {
        spinner.finish_warning(format!("Race condition detected ({})", analysis.severity));
    } else {
        spinner.finish_success("Race test complete");
    }

    let report_path = config
        .output
        .clone()
        .unwrap_or_else(|| default_report_path(Local::now()));

    output(
        &RunSummary {
            target_url: &config.target_url,
            amount: config.amount,
            concurrency: config.concurrency,
            analysis: &analysis,
            report_path: Some(report_path.clone()),
        },
        cli.json,
    );

    RunReport::new(&config, &state, &analysis)
        .and_then(|report| report.write_to(&report_path))
        .with_context(|| format!("Failed to save results to {}", report_path.display()))?;
    info!(path = %report_path.display(), "report written");

    Ok(())
}

/// Build the shared HTTP session and run the configured attempts
///
/// `observer` is called after each attempt. The configuration must already be
/// validated.
pub async fn run_test<F>(config: &TestConfig, observer: F) -> Result<(RunState, AnalysisVerdict)>
where
    F: FnMut(&AttemptResult),
{
    let client = build_http_client(&HttpClientConfig::from(config))
        .context("Failed to build HTTP client")?;

    let csrf_token = HttpTokenSource::new(client.clone(), config).fetch_token().await;
    if csrf_token.is_some() {
        info!("CSRF token retrieved; sending it with every request");
    }

    let transport = HttpTransactionTransport::new(client.clone(), config.target_url.clone())
        .with_csrf_header(&config.csrf_header);
    let dispatcher = ConcurrentDispatcher::new(Arc::new(transport), DispatchSettings::from(config))
        .with_success_policy(SuccessPolicy::from_statuses(&config.success_statuses))
        .with_csrf_token(csrf_token);

    let mut orchestrator = AttemptOrchestrator::new(dispatcher, OrchestratorSettings::from(config));
    if let Some(balance_url) = config.balance_url.as_ref().filter(|_| config.verify_balance) {
        orchestrator = orchestrator.with_probe(Arc::new(HttpStateProbe::new(
            client,
            balance_url.clone(),
            BalanceExtractor::from_config(config),
        )));
    } else if config.balance_url.is_some() {
        warn!("balance URL given without --verify-balance; balance will not be checked");
    }

    let state = orchestrator.run_observed(RunState::new(), observer).await;
    let analysis = VerdictAnalyzer::from_config(config).analyze(&state);
    info!(
        run_id = %state.run_id,
        severity = %analysis.severity,
        race_detected = analysis.race_detected,
        "analysis complete"
    );

    Ok((state, analysis))
}
