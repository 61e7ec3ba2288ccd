//! HTTP client behavior: retries, error shapes and auth headers.

use std::time::Duration;

use httpmock::prelude::*;
use movemint::MoveMintError;
use movemint::api::{ApiClient, ApiErrorCode, ApiErrorHandler, ErrorAction};
use serde_json::{Value, json};
use tempfile::TempDir;

use super::fixture::{api_client, fast_retry};

fn api_error(err: MoveMintError) -> movemint::api::ApiError {
    match err {
        MoveMintError::Api(api) => api,
        other => panic!("expected an engine error, got {other:?}"),
    }
}

#[test]
fn retries_service_unavailable_until_budget_runs_out() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/health");
        then.status(503).json_body(json!({ "message": "warming up" }));
    });

    let err = api_error(api_client(&server, 2).get::<Value>("/api/health").unwrap_err());

    mock.assert_calls(3);
    assert_eq!(err.code, ApiErrorCode::ServiceUnavailable);
    assert_eq!(err.message, "warming up");
    assert!(err.retryable);
    assert_eq!(ApiErrorHandler::classify(&err).action, ErrorAction::Retry);
}

#[test]
fn validation_errors_are_not_retried() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/analysis");
        then.status(422).json_body(json!({
            "error": {
                "code": "INVALID_VIDEO",
                "message": "video is too short",
                "details": { "minSeconds": 3 }
            }
        }));
    });

    let err = api_error(
        api_client(&server, 3)
            .post::<_, Value>("/api/analysis", &json!({ "videoId": "v1" }))
            .unwrap_err(),
    );

    mock.assert_calls(1);
    assert_eq!(err.code, ApiErrorCode::ValidationError);
    assert_eq!(err.status, Some(422));
    assert!(!err.retryable);
    let details = err.details.clone().unwrap();
    assert_eq!(details["minSeconds"], 3);
    assert_eq!(details["serverCode"], "INVALID_VIDEO");
    assert_eq!(ApiErrorHandler::classify(&err).action, ErrorAction::Fix);
}

#[test]
fn rate_limit_honors_small_retry_after() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/licenses/templates");
        then.status(429).header("Retry-After", "0").body("slow down");
    });

    let err = api_error(
        api_client(&server, 1)
            .get::<Value>("/api/licenses/templates")
            .unwrap_err(),
    );

    mock.assert_calls(2);
    assert_eq!(err.code, ApiErrorCode::RateLimited);
}

#[test]
fn success_body_is_decoded() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/health");
        then.status(200).json_body(json!({ "status": "ok", "version": "1.4.0" }));
    });

    let body: Value = api_client(&server, 0).get("/api/health").unwrap();
    assert_eq!(body["version"], "1.4.0");
}

#[test]
fn non_json_success_is_invalid_response() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/health");
        then.status(200).body("<html>proxy page</html>");
    });

    let err = api_error(api_client(&server, 2).get::<Value>("/api/health").unwrap_err());
    assert_eq!(err.code, ApiErrorCode::InvalidResponse);
    assert!(!err.retryable);
}

#[test]
fn bearer_token_is_sent() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/health")
            .header("authorization", "Bearer test-token");
        then.status(200).json_body(json!({ "status": "ok" }));
    });

    let client = api_client(&server, 0).with_token(Some("test-token".to_string()));
    let _: Value = client.get("/api/health").unwrap();
    mock.assert();
}

#[test]
fn unreachable_engine_is_network_error() {
    // Port 9 (discard) is closed on test machines.
    let client = movemint::api::ApiClient::new("http://127.0.0.1:9", std::time::Duration::from_secs(2))
        .unwrap()
        .with_retry_policy(super::fixture::fast_retry(0));
    let err = api_error(client.get::<Value>("/api/health").unwrap_err());
    assert_eq!(err.code, ApiErrorCode::NetworkError);
    assert!(err.retryable);
}

#[test]
fn custom_user_agent_is_sent() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/api/health")
            .header("user-agent", "movemint-ci/1.0");
        then.status(200).json_body(json!({ "status": "ok" }));
    });

    let client = api_client(&server, 0).with_user_agent("movemint-ci/1.0").unwrap();
    let _: Value = client.get("/api/health").unwrap();
    mock.assert();
}

#[test]
fn slow_response_is_timeout_error() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/api/health");
        then.status(200)
            .json_body(json!({ "status": "ok" }))
            .delay(Duration::from_millis(1500));
    });

    let client = ApiClient::new(&server.base_url(), Duration::from_millis(300))
        .unwrap()
        .with_retry_policy(fast_retry(0));
    let err = api_error(client.get::<Value>("/api/health").unwrap_err());

    mock.assert_calls(1);
    assert_eq!(err.code, ApiErrorCode::Timeout);
    assert!(err.retryable);
    assert!(err.message.contains("300ms"), "message: {}", err.message);
    assert_eq!(ApiErrorHandler::classify(&err).action, ErrorAction::Retry);
}

#[test]
fn put_sends_json_body_on_every_attempt() {
    let server = MockServer::start();
    let body = json!({ "licenseType": "commercial", "royaltyPercentage": 5 });
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/api/licenses/lic-1")
            .header("content-type", "application/json")
            .json_body(body.clone());
        then.status(503).json_body(json!({ "message": "busy" }));
    });

    let err = api_error(
        api_client(&server, 2)
            .put::<_, Value>("/api/licenses/lic-1", &body)
            .unwrap_err(),
    );

    mock.assert_calls(3);
    assert_eq!(err.code, ApiErrorCode::ServiceUnavailable);
}

#[test]
fn put_decodes_updated_resource() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/api/licenses/lic-1")
            .json_body(json!({ "royaltyPercentage": 7 }));
        then.status(200)
            .json_body(json!({ "id": "lic-1", "royaltyPercentage": 7 }));
    });

    let updated: Value = api_client(&server, 0)
        .put("/api/licenses/lic-1", &json!({ "royaltyPercentage": 7 }))
        .unwrap();

    mock.assert();
    assert_eq!(updated["royaltyPercentage"], 7);
}

#[test]
fn delete_accepts_empty_and_json_bodies() {
    let server = MockServer::start();
    let empty = server.mock(|when, then| {
        when.method(DELETE).path("/api/operations/op-1");
        then.status(204);
    });
    let with_body = server.mock(|when, then| {
        when.method(DELETE).path("/api/operations/op-2");
        then.status(200).json_body(json!({ "deleted": true }));
    });

    let client = api_client(&server, 0);
    let none: Option<Value> = client.delete("/api/operations/op-1").unwrap();
    let deleted: Value = client.delete("/api/operations/op-2").unwrap();

    empty.assert();
    with_body.assert();
    assert!(none.is_none());
    assert_eq!(deleted["deleted"], true);
}

#[test]
fn delete_not_found_is_not_retried() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(DELETE).path("/api/operations/missing");
        then.status(404).json_body(json!({ "message": "no such operation" }));
    });

    let err = api_error(
        api_client(&server, 3)
            .delete::<Value>("/api/operations/missing")
            .unwrap_err(),
    );

    mock.assert_calls(1);
    assert_eq!(err.status, Some(404));
    assert!(!err.retryable);
}

fn video_file(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("dance.mp4");
    std::fs::write(&path, b"\x00\x00\x00\x18ftypmp42fake-dance-video").unwrap();
    path
}

#[test]
fn upload_outlives_request_timeout() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/api/upload");
        then.status(200)
            .json_body(json!({ "videoId": "vid-1" }))
            .delay(Duration::from_millis(600));
    });
    let dir = TempDir::new().unwrap();
    let video = video_file(&dir);

    let client = ApiClient::new(&server.base_url(), Duration::from_millis(200))
        .unwrap()
        .with_upload_timeout(Duration::from_secs(10))
        .with_retry_policy(fast_retry(0));
    let body: Value = client.upload_file("/api/upload", "video", &video, None).unwrap();

    mock.assert();
    assert_eq!(body["videoId"], "vid-1");
}

#[test]
fn upload_timeout_is_reported_with_upload_limit() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/api/upload");
        then.status(200)
            .json_body(json!({ "videoId": "vid-1" }))
            .delay(Duration::from_millis(1500));
    });
    let dir = TempDir::new().unwrap();
    let video = video_file(&dir);

    let client = ApiClient::new(&server.base_url(), Duration::from_secs(10))
        .unwrap()
        .with_upload_timeout(Duration::from_millis(250))
        .with_retry_policy(fast_retry(0));
    let err = api_error(
        client
            .upload_file::<Value>("/api/upload", "video", &video, None)
            .unwrap_err(),
    );

    assert_eq!(err.code, ApiErrorCode::Timeout);
    assert!(err.message.contains("250ms"), "message: {}", err.message);
}
