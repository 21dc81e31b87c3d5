//! Integration tests for request sending, retry and quota throttling.

mod common;

use common::*;
use flagsync_client::{ApiFamily, ClientConfig, ClientError, REMAINING_HEADER, RESET_HEADER};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn epoch_ms_from_now(offset_ms: i64) -> String {
    (chrono::Utc::now().timestamp_millis() + offset_ms).to_string()
}

#[tokio::test]
async fn test_sends_token_and_json_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/projects"))
        .and(header("Authorization", "api-test-token"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"key": "p"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"key": "p"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let response = client
        .post("/projects", &json!({"key": "p"}), ApiFamily::Stable)
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert!(response.is_success());
    let body: Value = response.json().unwrap();
    assert_eq!(body["key"], "p");
}

#[tokio::test]
async fn test_beta_family_sends_version_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/projects/p/metric-groups"))
        .and(header("LD-API-Version", "beta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let response = client
        .get("/projects/p/metric-groups", ApiFamily::Beta)
        .await
        .unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_internal_family_uses_internal_tree() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/internal/projects/p/flag-templates/release"))
        .and(header_exists("LD-API-Version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let response = client
        .patch(
            "/projects/p/flag-templates/release",
            &json!([]),
            ApiFamily::InternalBeta,
        )
        .await
        .unwrap();
    assert!(response.is_success());
}

#[tokio::test]
async fn test_error_status_returned_as_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/projects/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"code": "not_found", "message": "Unknown project"})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let response = client
        .get("/projects/missing", ApiFamily::Stable)
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(response.error_code().as_deref(), Some("not_found"));
    assert!(matches!(
        response.error_for_status(),
        Err(ClientError::Api { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_connection_failure_after_five_attempts() {
    let client = test_client("http://127.0.0.1:1");

    let result = client.get("/projects/p", ApiFamily::Stable).await;

    match result {
        Err(ClientError::ConnectionFailed { attempts, url, .. }) => {
            assert_eq!(attempts, 5);
            assert_eq!(url, "http://127.0.0.1:1/api/v2/projects/p");
        }
        other => panic!("Expected ConnectionFailed, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_low_quota_waits_until_reset() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/flags/p"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(REMAINING_HEADER, "3")
                .insert_header(RESET_HEADER, epoch_ms_from_now(800).as_str())
                .set_body_json(json!({"items": []})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let start = Instant::now();
    let response = client.get("/flags/p", ApiFamily::Stable).await.unwrap();

    assert_eq!(response.status, 200);
    assert!(
        start.elapsed() >= Duration::from_millis(600),
        "expected to wait for the reset, waited {:?}",
        start.elapsed()
    );
}

#[tokio::test]
async fn test_low_quota_with_past_reset_waits_floor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/flags/p"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(REMAINING_HEADER, "5")
                .insert_header(RESET_HEADER, epoch_ms_from_now(-10_000).as_str())
                .set_body_json(json!({"items": []})),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::for_testing().with_min_quota_wait(Duration::from_millis(500));
    let client = client_with_config(&server.uri(), config);

    let start = Instant::now();
    client.get("/flags/p", ApiFamily::Stable).await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(500));
}

#[tokio::test]
async fn test_healthy_quota_does_not_wait() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/flags/p"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(REMAINING_HEADER, "100")
                .insert_header(RESET_HEADER, epoch_ms_from_now(60_000).as_str())
                .set_body_json(json!({"items": []})),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let start = Instant::now();
    client.get("/flags/p", ApiFamily::Stable).await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_exhausted_quota_budget_surfaces_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/flags/p"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(REMAINING_HEADER, "0")
                .set_body_json(json!({"items": []})),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::for_testing().with_quota_tries(2);
    let client = client_with_config(&server.uri(), config);

    assert!(client.get("/flags/p", ApiFamily::Stable).await.is_ok());
    let result = client.get("/flags/p", ApiFamily::Stable).await;
    assert!(matches!(
        result,
        Err(ClientError::RateLimitExceeded { ref path }) if path == "/flags/p"
    ));
}

#[tokio::test]
async fn test_healthy_response_refills_budget() {
    let server = MockServer::start().await;

    let low = ResponseTemplate::new(200)
        .insert_header(REMAINING_HEADER, "1")
        .set_body_json(json!({}));
    let healthy = ResponseTemplate::new(200)
        .insert_header(REMAINING_HEADER, "50")
        .set_body_json(json!({}));

    Mock::given(method("GET"))
        .and(path("/api/v2/projects/p"))
        .respond_with(SequenceResponder::new(vec![
            low.clone(),
            healthy,
            low.clone(),
            low,
        ]))
        .mount(&server)
        .await;

    let config = ClientConfig::for_testing().with_quota_tries(2);
    let client = client_with_config(&server.uri(), config);

    assert!(client.get("/projects/p", ApiFamily::Stable).await.is_ok());
    assert!(client.get("/projects/p", ApiFamily::Stable).await.is_ok());
    assert!(client.get("/projects/p", ApiFamily::Stable).await.is_ok());
    assert!(matches!(
        client.get("/projects/p", ApiFamily::Stable).await,
        Err(ClientError::RateLimitExceeded { .. })
    ));
}

#[tokio::test]
async fn test_too_many_requests_is_resent() {
    let server = MockServer::start().await;

    let responder = SequenceResponder::new(vec![
        ResponseTemplate::new(429).insert_header("Retry-After", "0"),
        ResponseTemplate::new(200).set_body_json(json!({"key": "p"})),
    ]);
    let calls = responder.calls();

    Mock::given(method("GET"))
        .and(path("/api/v2/projects/p"))
        .respond_with(responder)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let response = client.get("/projects/p", ApiFamily::Stable).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_persistent_too_many_requests_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/projects/p"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let config = ClientConfig::for_testing().with_quota_tries(3);
    let client = client_with_config(&server.uri(), config);

    let result = client.get("/projects/p", ApiFamily::Stable).await;
    assert!(matches!(result, Err(ClientError::RateLimitExceeded { .. })));
}
