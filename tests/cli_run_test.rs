//! The `run` command from parsed arguments to the report file

use clap::Parser;
use raceprobe::cli::commands::execute;
use raceprobe::cli::Cli;
use raceprobe::infrastructure::config::ConfigError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_run_writes_redacted_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/transfer"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/transfer"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.json");
    let url = format!("{}/api/transfer", server.uri());
    let cli = Cli::try_parse_from([
        "raceprobe",
        "--url",
        url.as_str(),
        "--token",
        "very-secret-token",
        "--concurrent",
        "6",
        "--json",
        "--output",
        report_path.to_str().unwrap(),
    ])
    .unwrap();

    execute(cli).await.unwrap();

    let raw = std::fs::read_to_string(&report_path).unwrap();
    assert!(!raw.contains("very-secret-token"));

    let report: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(report["config"]["auth_token"], "[REDACTED]");
    assert_eq!(report["config"]["concurrency"], 6);
    assert_eq!(report["analysis"]["severity"], "HIGH");
    assert_eq!(report["analysis"]["race_detected"], true);
    assert_eq!(report["analysis"]["successful_requests"], 2);
    assert_eq!(report["attempts"].as_array().unwrap().len(), 1);

    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 6);
    for record in results {
        assert!(record["request_id"].is_u64());
        assert!(record["status_code"].is_u64());
        assert!(record["response_time"].is_f64());
        assert!(record["success"].is_boolean());
        assert!(record["timestamp"].is_string());
    }
}

#[tokio::test]
async fn test_missing_url_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("never.json");
    let cli = Cli::try_parse_from([
        "raceprobe",
        "--token",
        "t",
        "--output",
        report_path.to_str().unwrap(),
    ])
    .unwrap();

    let err = execute(cli).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingTargetUrl)
    ));
    assert!(!report_path.exists(), "no report on configuration errors");
}

#[tokio::test]
async fn test_verify_balance_without_balance_url_is_rejected() {
    let cli = Cli::try_parse_from([
        "raceprobe",
        "--url",
        "https://bank.test/transfer",
        "--token",
        "t",
        "--verify-balance",
    ])
    .unwrap();

    let err = execute(cli).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingBalanceUrl)
    ));
}
