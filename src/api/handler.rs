//! Turns [`ApiError`]s into messages a person can act on.

use serde::Serialize;
use tracing::{error, info, warn};

use super::error::{ApiError, ApiErrorCode};

/// What the user should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorAction {
    Retry,
    Fix,
    ContactSupport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserFacingError {
    pub message: String,
    pub action: ErrorAction,
    pub retryable: bool,
}

impl std::fmt::Display for UserFacingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiErrorHandler;

impl ApiErrorHandler {
    /// Pure classification: the same error always yields the same result.
    #[must_use]
    pub fn classify(error: &ApiError) -> UserFacingError {
        let action = if error.retryable {
            ErrorAction::Retry
        } else {
            match error.code {
                ApiErrorCode::BadRequest
                | ApiErrorCode::NotFound
                | ApiErrorCode::Conflict
                | ApiErrorCode::PayloadTooLarge
                | ApiErrorCode::ValidationError
                | ApiErrorCode::Unauthorized
                | ApiErrorCode::Forbidden => ErrorAction::Fix,
                _ => ErrorAction::ContactSupport,
            }
        };

        UserFacingError {
            message: message_for(error),
            action,
            retryable: error.retryable,
        }
    }

    /// Classify and log at a level matching the action.
    pub fn handle(error: &ApiError, context: &str) -> UserFacingError {
        let classified = Self::classify(error);
        match classified.action {
            ErrorAction::Retry => warn!(
                context,
                code = %error.code,
                status = error.status,
                "{}",
                error.message
            ),
            ErrorAction::Fix => info!(
                context,
                code = %error.code,
                status = error.status,
                "{}",
                error.message
            ),
            ErrorAction::ContactSupport => error!(
                context,
                code = %error.code,
                status = error.status,
                details = ?error.details,
                "{}",
                error.message
            ),
        }
        classified
    }
}

fn message_for(error: &ApiError) -> String {
    match error.code {
        ApiErrorCode::NetworkError => {
            "Could not reach the minting engine. Check your connection and try again.".to_string()
        }
        ApiErrorCode::Timeout | ApiErrorCode::RequestTimeout => {
            "The request took too long. Please try again.".to_string()
        }
        ApiErrorCode::RateLimited => {
            "Too many requests. Wait a moment before trying again.".to_string()
        }
        ApiErrorCode::ServiceUnavailable => {
            "The minting engine is temporarily unavailable. Please try again shortly.".to_string()
        }
        ApiErrorCode::ServerError if error.retryable => {
            "The minting engine ran into a problem. Please try again.".to_string()
        }
        ApiErrorCode::ServerError => format!(
            "The minting engine failed unexpectedly ({}). Contact support if this persists.",
            error.message
        ),
        ApiErrorCode::Unauthorized => {
            "Authentication failed. Check the API token in your configuration.".to_string()
        }
        ApiErrorCode::Forbidden => "You do not have permission for this action.".to_string(),
        ApiErrorCode::NotFound => format!("Not found: {}", error.message),
        ApiErrorCode::Conflict => format!("Conflict with the current state: {}", error.message),
        ApiErrorCode::PayloadTooLarge => {
            "The file is too large. Try a shorter or more compressed video.".to_string()
        }
        ApiErrorCode::BadRequest | ApiErrorCode::ValidationError => {
            format!("The request was rejected: {}", error.message)
        }
        ApiErrorCode::InvalidResponse => {
            "The minting engine sent a response we could not understand. Contact support if this persists."
                .to_string()
        }
        ApiErrorCode::Unknown => format!("Unexpected error: {}", error.message),
    }
}
