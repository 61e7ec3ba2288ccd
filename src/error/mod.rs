//! Error handling for movemint.
//!
//! This module provides:
//! - [`MoveMintError`]: The main error enum for all movemint operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Rich error type with suggestions and context
//!
//! HTTP failures keep their own tagged type, [`ApiError`], and are wrapped
//! here through [`MoveMintError::Api`].

mod codes;
mod suggestions;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::api::{ApiError, ApiErrorCode};

pub use codes::ErrorCode;
pub use suggestions::suggest_for_error;

/// Main error type for movemint operations.
#[derive(Error, Debug)]
pub enum MoveMintError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("No active workflow session")]
    NoActiveSession,

    #[error("No {0} data in the current session")]
    SubSessionMissing(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Operation already running: {0}")]
    OperationExists(String),

    #[error("Operation {operation_id} already finished ({stage})")]
    OperationFinished { operation_id: String, stage: String },

    #[error("Operation is paused: {0}")]
    OperationPaused(String),

    #[error("Operation {operation_id} does not support {capability}")]
    OperationUnsupported {
        operation_id: String,
        capability: &'static str,
    },

    #[error("Unknown sub-stage '{sub_stage}' for operation {operation_id}")]
    UnknownSubStage {
        operation_id: String,
        sub_stage: String,
    },

    #[error("Sub-stage '{sub_stage}' of {operation_id} out of order: {reason}")]
    SubStageOutOfOrder {
        operation_id: String,
        sub_stage: String,
        reason: String,
    },

    #[error("Invalid progress value: {0}")]
    InvalidProgress(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl MoveMintError {
    /// Get the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::SerializationError,
            Self::Api(err) => api_error_code(err.code),
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
            Self::Storage(_) => ErrorCode::StorageError,
            Self::NoActiveSession => ErrorCode::SessionNotFound,
            Self::SubSessionMissing(_) => ErrorCode::SubSessionMissing,
            Self::UnknownOperation(_) => ErrorCode::OperationNotFound,
            Self::OperationExists(_) => ErrorCode::OperationExists,
            Self::OperationFinished { .. } => ErrorCode::OperationFinished,
            Self::OperationPaused(_) => ErrorCode::OperationPaused,
            Self::OperationUnsupported { .. } => ErrorCode::OperationUnsupported,
            Self::UnknownSubStage { .. } => ErrorCode::SubStageNotFound,
            Self::SubStageOutOfOrder { .. } => ErrorCode::SubStageOutOfOrder,
            Self::InvalidProgress(_) => ErrorCode::ProgressInvalid,
            Self::ValidationFailed(_) => ErrorCode::ValidationFailed,
            Self::Timeout(_) => ErrorCode::Timeout,
        }
    }

    /// Get context information for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::Api(err) => Some(serde_json::json!({
                "api_code": err.code,
                "status": err.status,
                "retryable": err.retryable,
                "details": err.details,
            })),
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            Self::SubSessionMissing(kind) => Some(serde_json::json!({ "sub_session": kind })),
            Self::UnknownOperation(id) | Self::OperationExists(id) | Self::OperationPaused(id) => {
                Some(serde_json::json!({ "operation_id": id }))
            }
            Self::OperationFinished {
                operation_id,
                stage,
            } => Some(serde_json::json!({ "operation_id": operation_id, "stage": stage })),
            Self::UnknownSubStage {
                operation_id,
                sub_stage,
            }
            | Self::SubStageOutOfOrder {
                operation_id,
                sub_stage,
                ..
            } => Some(serde_json::json!({
                "operation_id": operation_id,
                "sub_stage": sub_stage,
            })),
            _ => None,
        }
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api(err) => err.retryable,
            Self::Timeout(_) => true,
            _ => false,
        }
    }

    /// Convert this error to a structured error.
    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_error(self)
    }
}

const fn api_error_code(code: ApiErrorCode) -> ErrorCode {
    match code {
        ApiErrorCode::NetworkError => ErrorCode::NetworkUnreachable,
        ApiErrorCode::Timeout | ApiErrorCode::RequestTimeout => ErrorCode::NetworkTimeout,
        ApiErrorCode::Unauthorized | ApiErrorCode::Forbidden => ErrorCode::NetworkAuthFailed,
        ApiErrorCode::BadRequest
        | ApiErrorCode::Conflict
        | ApiErrorCode::PayloadTooLarge
        | ApiErrorCode::ValidationError => ErrorCode::ApiRequestRejected,
        ApiErrorCode::NotFound => ErrorCode::ApiNotFound,
        ApiErrorCode::RateLimited => ErrorCode::ApiRateLimited,
        ApiErrorCode::ServerError | ApiErrorCode::ServiceUnavailable => ErrorCode::ApiServerError,
        ApiErrorCode::InvalidResponse => ErrorCode::ApiInvalidResponse,
        ApiErrorCode::Unknown => ErrorCode::InternalError,
    }
}

/// A structured error with machine-readable code, suggestion, and context.
///
/// Emitted in robot mode so scripts can branch on `code` and `recoverable`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// The error code (e.g., "SESSION_NOT_FOUND")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 101)
    pub numeric_code: u16,

    /// Human-readable error message
    pub message: String,

    /// Actionable suggestion for recovery
    pub suggestion: String,

    /// Additional context for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Whether this error is potentially recoverable by the user
    pub recoverable: bool,

    /// Error category (e.g., "session", "network")
    pub category: String,
}

impl StructuredError {
    /// Create a new structured error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            numeric_code: code.numeric(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
            code,
            message: message.into(),
        }
    }

    /// Create a structured error from a [`MoveMintError`].
    #[must_use]
    pub fn from_error(err: &MoveMintError) -> Self {
        let code = err.code();
        let context = err.context();
        let suggestion = suggest_for_error(code, context.as_ref());

        Self {
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion,
            context,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&MoveMintError> for StructuredError {
    fn from(err: &MoveMintError) -> Self {
        Self::from_error(err)
    }
}

/// Result type alias using [`MoveMintError`].
pub type Result<T> = std::result::Result<T, MoveMintError>;
