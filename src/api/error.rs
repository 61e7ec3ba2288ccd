//! Tagged HTTP error type and its pure classification rules.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    NetworkError,
    Timeout,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RequestTimeout,
    Conflict,
    PayloadTooLarge,
    ValidationError,
    RateLimited,
    ServerError,
    ServiceUnavailable,
    InvalidResponse,
    Unknown,
}

impl ApiErrorCode {
    /// Code for an HTTP error status. Non-error statuses map to `Unknown`.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            408 => Self::RequestTimeout,
            409 => Self::Conflict,
            413 => Self::PayloadTooLarge,
            422 => Self::ValidationError,
            429 => Self::RateLimited,
            503 => Self::ServiceUnavailable,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NetworkError => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::RequestTimeout => "REQUEST_TIMEOUT",
            Self::Conflict => "CONFLICT",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::RateLimited => "RATE_LIMITED",
            Self::ServerError => "SERVER_ERROR",
            Self::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True for statuses worth retrying: 5xx, 429 and 408.
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

/// Failure of a call to the minting engine.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Server-requested wait from a `Retry-After` header.
    #[serde(skip)]
    pub retry_after: Option<Duration>,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            retryable: matches!(code, ApiErrorCode::NetworkError | ApiErrorCode::Timeout),
            status: None,
            retry_after: None,
        }
    }

    /// Build an error from a non-success response.
    ///
    /// Understands `{"error": {"code", "message", "details"}}`,
    /// `{"error": "..."}` and `{"message": "..."}` bodies; anything else falls
    /// back to the status reason phrase.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        let code = ApiErrorCode::from_status(status);
        let parsed = parse_error_body(body);
        let message = parsed
            .message
            .unwrap_or_else(|| default_message(status).to_string());

        let details = match (parsed.server_code, parsed.details) {
            (Some(server_code), Some(Value::Object(mut map))) => {
                map.insert("serverCode".to_string(), Value::String(server_code));
                Some(Value::Object(map))
            }
            (Some(server_code), None) => Some(serde_json::json!({ "serverCode": server_code })),
            (_, details) => details,
        };

        Self {
            code,
            message,
            details,
            retryable: is_retryable_status(status),
            status: Some(status),
            retry_after: None,
        }
    }

    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NetworkError, message)
    }

    #[must_use]
    pub fn timeout(after: Duration) -> Self {
        Self::new(
            ApiErrorCode::Timeout,
            format!("Request timed out after {}", humanize(after)),
        )
    }

    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidResponse, message)
    }

    #[must_use]
    pub fn with_retry_after(mut self, after: Option<Duration>) -> Self {
        self.retry_after = after;
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Default)]
struct ParsedBody {
    message: Option<String>,
    server_code: Option<String>,
    details: Option<Value>,
}

fn parse_error_body(body: &str) -> ParsedBody {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return ParsedBody::default();
    };
    let non_empty = |v: &Value| {
        v.as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
    };

    match value.get("error") {
        Some(Value::Object(err)) => ParsedBody {
            message: err.get("message").and_then(non_empty),
            server_code: err.get("code").and_then(non_empty),
            details: err.get("details").filter(|d| !d.is_null()).cloned(),
        },
        Some(err @ Value::String(_)) => ParsedBody {
            message: non_empty(err),
            details: value.get("details").filter(|d| !d.is_null()).cloned(),
            ..ParsedBody::default()
        },
        _ => ParsedBody {
            message: value.get("message").and_then(non_empty),
            ..ParsedBody::default()
        },
    }
}

const fn default_message(status: u16) -> &'static str {
    match status {
        400 => "Bad request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not found",
        408 => "Request timeout",
        409 => "Conflict",
        413 => "Payload too large",
        422 => "Validation failed",
        429 => "Too many requests",
        500 => "Internal server error",
        502 => "Bad gateway",
        503 => "Service unavailable",
        504 => "Gateway timeout",
        500..=599 => "Server error",
        _ => "Unexpected response",
    }
}

fn humanize(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
