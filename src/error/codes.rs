//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Session errors
//! - 2xx: Progress errors
//! - 3xx: Config errors
//! - 4xx: API request errors
//! - 5xx: Network errors
//! - 6xx: Storage errors
//! - 8xx: Validation errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for robot mode output.
///
/// Each variant maps to a numeric code (e.g., `SessionNotFound` -> E101).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================
    // Session errors (1xx)
    // ========================================
    /// E101: No workflow session is stored
    SessionNotFound,
    /// E103: Sub-session is missing for the requested step
    SubSessionMissing,

    // ========================================
    // Progress errors (2xx)
    // ========================================
    /// E201: No operation is tracked under the given id
    OperationNotFound,
    /// E202: A live operation already uses the given id
    OperationExists,
    /// E203: Operation already reached a terminal stage
    OperationFinished,
    /// E204: Operation is paused
    OperationPaused,
    /// E205: Operation does not support pause or cancel
    OperationUnsupported,
    /// E206: Sub-stage name is unknown
    SubStageNotFound,
    /// E207: Sub-stage transition would break ordering
    SubStageOutOfOrder,
    /// E208: Progress value is not usable
    ProgressInvalid,

    // ========================================
    // Config errors (3xx)
    // ========================================
    /// E301: Config file has invalid syntax or values
    ConfigInvalid,
    /// E302: Required config value is missing
    ConfigMissingRequired,

    // ========================================
    // API request errors (4xx)
    // ========================================
    /// E401: Server rejected the request as malformed or invalid
    ApiRequestRejected,
    /// E402: Requested resource does not exist
    ApiNotFound,
    /// E403: Server is throttling requests
    ApiRateLimited,
    /// E404: Server failed while handling the request
    ApiServerError,
    /// E405: Server response could not be decoded
    ApiInvalidResponse,

    // ========================================
    // Network errors (5xx)
    // ========================================
    /// E501: Cannot reach remote server
    NetworkUnreachable,
    /// E502: Network request timed out
    NetworkTimeout,
    /// E503: Authentication with remote failed
    NetworkAuthFailed,

    // ========================================
    // Storage errors (6xx)
    // ========================================
    /// E601: Failed to read or write storage
    StorageError,
    /// E602: Serialization/deserialization failed
    SerializationError,

    // ========================================
    // Validation errors (8xx)
    // ========================================
    /// E801: Validation rules failed
    ValidationFailed,

    // ========================================
    // Internal errors (9xx)
    // ========================================
    /// E901: Unexpected internal error
    InternalError,
    /// E902: Operation timed out
    Timeout,
    /// E903: IO operation failed
    IoError,
}

impl ErrorCode {
    /// Get the numeric error code (e.g., `SessionNotFound` -> 101).
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::SessionNotFound => 101,
            Self::SubSessionMissing => 103,

            Self::OperationNotFound => 201,
            Self::OperationExists => 202,
            Self::OperationFinished => 203,
            Self::OperationPaused => 204,
            Self::OperationUnsupported => 205,
            Self::SubStageNotFound => 206,
            Self::SubStageOutOfOrder => 207,
            Self::ProgressInvalid => 208,

            Self::ConfigInvalid => 301,
            Self::ConfigMissingRequired => 302,

            Self::ApiRequestRejected => 401,
            Self::ApiNotFound => 402,
            Self::ApiRateLimited => 403,
            Self::ApiServerError => 404,
            Self::ApiInvalidResponse => 405,

            Self::NetworkUnreachable => 501,
            Self::NetworkTimeout => 502,
            Self::NetworkAuthFailed => 503,

            Self::StorageError => 601,
            Self::SerializationError => 602,

            Self::ValidationFailed => 801,

            Self::InternalError => 901,
            Self::Timeout => 902,
            Self::IoError => 903,
        }
    }

    /// Get the error code as a formatted string (e.g., "E101").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    /// Get the default suggestion for this error code.
    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "Start a new workflow with `movemint upload <file>`",
            Self::SubSessionMissing => "Run `movemint session resume` to see which step to continue from",

            Self::OperationNotFound => "Check the operation id. Finished operations may already have been cleared",
            Self::OperationExists => "Wait for the running operation to finish or cancel it first",
            Self::OperationFinished => "Start a new operation instead of updating a finished one",
            Self::OperationPaused => "Resume the operation before reporting more progress",
            Self::OperationUnsupported => "This operation was started without pause/cancel support",
            Self::SubStageNotFound => "Use one of the sub-stage names the operation was started with",
            Self::SubStageOutOfOrder => "Sub-stages must run in the order they were declared",
            Self::ProgressInvalid => "Progress values must be finite numbers between 0 and 100",

            Self::ConfigInvalid => "Run `movemint config` to see current values. Check TOML syntax in config file",
            Self::ConfigMissingRequired => "Set the required value in config.toml or through its MOVEMINT_* variable",

            Self::ApiRequestRejected => "Check the submitted data and try again",
            Self::ApiNotFound => "The requested video or resource does not exist on the server",
            Self::ApiRateLimited => "Too many requests. Wait a moment before trying again",
            Self::ApiServerError => "The minting engine had a problem. Try again later",
            Self::ApiInvalidResponse => "The server sent an unexpected response. Check that api.base_url points at the minting engine",

            Self::NetworkUnreachable => "Check your network connection and ensure the minting engine is reachable",
            Self::NetworkTimeout => "The server is slow to respond. Retry, or raise api.timeout in config",
            Self::NetworkAuthFailed => "Verify api.api_key (or MOVEMINT_API_KEY)",

            Self::StorageError => "Check permissions on the session storage directory",
            Self::SerializationError => "The data format may be corrupted. Check input data for validity",

            Self::ValidationFailed => "Review the validation errors and fix each field",

            Self::InternalError => "This is a bug. Please report it with the command that triggered it",
            Self::Timeout => "The operation took too long. Retry, or raise polling.timeout in config",
            Self::IoError => "Check file paths and permissions",
        }
    }

    /// Whether the user can usually recover from this error without outside help.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InternalError | Self::ApiInvalidResponse)
    }

    /// Category name for grouping (e.g., "session", "network").
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "session",
            2 => "progress",
            3 => "config",
            4 => "api",
            5 => "network",
            6 => "storage",
            8 => "validation",
            _ => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}
