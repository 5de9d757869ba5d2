//! End-to-end runs against a wiremock target

mod common;

use common::test_config;
use raceprobe::cli::commands::run_test;
use raceprobe::domain::models::{Severity, TestConfig};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_balances(server: &MockServer, before: f64, after: f64) {
    Mock::given(method("GET"))
        .and(path("/api/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "balance": before })))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "balance": after })))
        .mount(server)
        .await;
}

async fn mount_transfers(server: &MockServer, accepted: u64) {
    if accepted > 0 {
        Mock::given(method("POST"))
            .and(path("/api/transfer"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "ok" })),
            )
            .up_to_n_times(accepted)
            .mount(server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/api/transfer"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate transaction"))
        .mount(server)
        .await;
}

fn verified_config(server: &MockServer) -> TestConfig {
    TestConfig {
        concurrency: 50,
        amount: 100.0,
        verify_balance: true,
        balance_url: Some(format!("{}/api/balance", server.uri())),
        ..test_config(&server.uri())
    }
}

#[tokio::test]
async fn test_single_acceptance_with_matching_balance_is_clean() {
    common::setup_test_logging();
    let server = MockServer::start().await;
    mount_transfers(&server, 1).await;
    mount_balances(&server, 1000.0, 1100.0).await;

    let (state, analysis) = run_test(&verified_config(&server), |_| {}).await.unwrap();

    assert_eq!(state.attempts.len(), 1);
    assert_eq!(analysis.total_requests, 50);
    assert_eq!(analysis.successful_requests, 1);
    assert!(!analysis.race_detected);
    assert_eq!(analysis.severity, Severity::None);
    let bv = analysis.balance_verification.unwrap();
    assert!((bv.change - 100.0).abs() < f64::EPSILON);
    assert!((bv.expected_change - 100.0).abs() < f64::EPSILON);
    assert_eq!(analysis.status_code_distribution["409"], 49);

    let rejected = state.records().find(|r| !r.success).unwrap();
    assert_eq!(rejected.response_data["text"], "duplicate transaction");
}

#[tokio::test]
async fn test_balance_overdraw_is_critical() {
    let server = MockServer::start().await;
    mount_transfers(&server, 1).await;
    mount_balances(&server, 1000.0, 1300.0).await;

    let (_, analysis) = run_test(&verified_config(&server), |_| {}).await.unwrap();

    assert_eq!(analysis.severity, Severity::Critical);
    assert!(analysis.race_detected);
    assert!(analysis.explanation.contains("300"));
}

#[tokio::test]
async fn test_multiple_acceptances_without_balance_is_high() {
    let server = MockServer::start().await;
    mount_transfers(&server, 5).await;

    let (_, analysis) = run_test(&test_config(&server.uri()), |_| {}).await.unwrap();

    assert_eq!(analysis.successful_requests, 5);
    assert_eq!(analysis.severity, Severity::High);
    assert!(analysis.balance_verification.is_none());
}

#[tokio::test]
async fn test_credential_and_csrf_token_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/transfer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "csrf_token": "abc123" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/transfer"))
        .and(header("authorization", "Bearer secret-token"))
        .and(header("x-csrf-token", "abc123"))
        .and(body_partial_json(serde_json::json!({
            "amount": 100.0,
            "transaction_type": "transfer",
            "csrf_token": "abc123"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(10)
        .mount(&server)
        .await;

    let (_, analysis) = run_test(&test_config(&server.uri()), |_| {}).await.unwrap();

    assert_eq!(analysis.successful_requests, 10);
    assert_eq!(analysis.severity, Severity::High);
}

#[tokio::test]
async fn test_probe_failure_degrades_attempt() {
    let server = MockServer::start().await;
    mount_transfers(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/balance"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (state, analysis) = run_test(&verified_config(&server), |_| {}).await.unwrap();

    assert!(state.attempts[0].degraded);
    assert!(analysis.balance_verification.is_none());
    assert_eq!(analysis.severity, Severity::None);
    assert!(analysis
        .warnings
        .iter()
        .any(|w| w.contains("before snapshot failed")));
}

#[tokio::test]
async fn test_custom_success_statuses() {
    let server = MockServer::start().await;
    mount_transfers(&server, 3).await;

    let config = TestConfig {
        success_statuses: vec![409],
        ..test_config(&server.uri())
    };
    let (_, analysis) = run_test(&config, |_| {}).await.unwrap();

    assert_eq!(analysis.successful_requests, 7);
}

#[tokio::test]
async fn test_slow_target_records_timeouts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/transfer"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = TestConfig {
        concurrency: 3,
        timeout_secs: 1,
        ..test_config(&server.uri())
    };
    let (_, analysis) = run_test(&config, |_| {}).await.unwrap();

    assert_eq!(analysis.status_code_distribution.get("timeout"), Some(&3));
    assert_eq!(analysis.successful_requests, 0);
    assert_eq!(analysis.severity, Severity::None);
    assert!(!analysis.warnings.is_empty());
}

#[tokio::test]
async fn test_unreachable_target_records_connection_errors() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = TestConfig {
        concurrency: 4,
        ..test_config(&format!("http://127.0.0.1:{port}"))
    };
    let (state, analysis) = run_test(&config, |_| {}).await.unwrap();

    assert_eq!(state.attempts[0].records.len(), 4);
    assert_eq!(analysis.status_code_distribution.get("connection"), Some(&4));
    assert_eq!(analysis.failed_requests, 4);
}

#[tokio::test]
async fn test_every_attempt_is_observed() {
    let server = MockServer::start().await;
    mount_transfers(&server, 0).await;

    let config = TestConfig {
        attempts: 3,
        concurrency: 4,
        ..test_config(&server.uri())
    };
    let mut observed = Vec::new();
    let (state, analysis) = run_test(&config, |attempt| observed.push(attempt.attempt))
        .await
        .unwrap();

    assert_eq!(observed, vec![1, 2, 3]);
    assert_eq!(state.attempts.len(), 3);
    assert_eq!(analysis.attempts.len(), 3);
    assert_eq!(analysis.total_requests, 12);
}
