use movemint::api::{ApiError, ApiErrorCode, ApiErrorHandler, ErrorAction, is_retryable_status};
use movemint::test_utils::{TestCase, run_table_tests};

#[test]
fn status_codes_classify() {
    run_table_tests(
        vec![
            TestCase { name: "bad request", input: 400, expected: (ApiErrorCode::BadRequest, false) },
            TestCase { name: "unauthorized", input: 401, expected: (ApiErrorCode::Unauthorized, false) },
            TestCase { name: "not found", input: 404, expected: (ApiErrorCode::NotFound, false) },
            TestCase { name: "request timeout", input: 408, expected: (ApiErrorCode::RequestTimeout, true) },
            TestCase { name: "too large", input: 413, expected: (ApiErrorCode::PayloadTooLarge, false) },
            TestCase { name: "unprocessable", input: 422, expected: (ApiErrorCode::ValidationError, false) },
            TestCase { name: "rate limited", input: 429, expected: (ApiErrorCode::RateLimited, true) },
            TestCase { name: "internal", input: 500, expected: (ApiErrorCode::ServerError, true) },
            TestCase { name: "bad gateway", input: 502, expected: (ApiErrorCode::ServerError, true) },
            TestCase { name: "unavailable", input: 503, expected: (ApiErrorCode::ServiceUnavailable, true) },
        ],
        |status| {
            let err = ApiError::from_status(status, "");
            assert_eq!(err.retryable, is_retryable_status(status));
            (err.code, err.retryable)
        },
    );
}

#[test]
fn actions_follow_retryability() {
    run_table_tests(
        vec![
            TestCase { name: "unavailable", input: ApiError::from_status(503, ""), expected: ErrorAction::Retry },
            TestCase { name: "network", input: ApiError::network("refused"), expected: ErrorAction::Retry },
            TestCase { name: "validation", input: ApiError::from_status(422, ""), expected: ErrorAction::Fix },
            TestCase { name: "forbidden", input: ApiError::from_status(403, ""), expected: ErrorAction::Fix },
            TestCase {
                name: "garbled",
                input: ApiError::invalid_response("not json"),
                expected: ErrorAction::ContactSupport,
            },
        ],
        |err| ApiErrorHandler::classify(&err).action,
    );
}

#[test]
fn timeout_message_names_duration() {
    let err = ApiError::timeout(std::time::Duration::from_secs(30));
    assert_eq!(err.code, ApiErrorCode::Timeout);
    assert!(err.retryable);
    assert!(err.message.contains("30s"));
}
