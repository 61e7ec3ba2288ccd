use chrono::{DateTime, TimeDelta, Utc};
use console::style;
use serde::Serialize;

use crate::api::{ApiErrorHandler, ErrorAction};
use crate::error::{ErrorCode, MoveMintError, Result, StructuredError};

#[derive(Serialize)]
pub struct RobotResponse<T> {
    pub status: RobotStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Ok,
    Error {
        /// Error code enum value (e.g., "SESSION_NOT_FOUND")
        code: ErrorCode,
        /// Numeric error code (e.g., 101)
        numeric_code: u16,
        message: String,
        /// Actionable suggestion for recovery
        suggestion: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<serde_json::Value>,
        recoverable: bool,
        category: String,
        /// Suggested next step for engine failures (retry, fix, contact_support)
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<ErrorAction>,
    },
}

pub fn robot_ok<T: Serialize>(data: T) -> RobotResponse<T> {
    RobotResponse {
        status: RobotStatus::Ok,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
        warnings: Vec::new(),
    }
}

/// Error response carrying the structured error and, for engine failures,
/// the suggested action.
pub fn robot_error(err: &MoveMintError) -> RobotResponse<serde_json::Value> {
    RobotResponse {
        status: RobotStatus::from(err),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data: serde_json::Value::Null,
        warnings: Vec::new(),
    }
}

impl From<&MoveMintError> for RobotStatus {
    fn from(err: &MoveMintError) -> Self {
        let StructuredError {
            code,
            numeric_code,
            message,
            suggestion,
            context,
            recoverable,
            category,
        } = err.to_structured();
        let action = match err {
            MoveMintError::Api(api) => Some(ApiErrorHandler::classify(api).action),
            _ => None,
        };
        Self::Error {
            code,
            numeric_code,
            message,
            suggestion,
            context,
            recoverable,
            category,
            action,
        }
    }
}

/// Human-readable error text for stderr.
#[must_use]
pub fn human_error(err: &MoveMintError) -> String {
    let structured = err.to_structured();
    let message = match err {
        MoveMintError::Api(api) => ApiErrorHandler::handle(api, "cli").message,
        other => other.to_string(),
    };
    format!(
        "{} [{}] {message}\n  {} {}",
        style("error:").red().bold(),
        structured.code,
        style("hint:").dim(),
        structured.suggestion
    )
}

pub fn emit_robot<T: Serialize>(response: &RobotResponse<T>) -> Result<()> {
    emit_json(response)
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)?;
    println!("{payload}");
    Ok(())
}

pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 18,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().to_string());
        self.lines.push(String::new());
        self
    }

    pub fn section(&mut self, text: &str) -> &mut Self {
        self.lines.push(String::new());
        self.lines.push(style(text).bold().to_string());
        self.lines.push("-".repeat(text.len().max(3)));
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        // pad before styling so ANSI codes do not eat the width
        let padded = format!("{key:width$}", width = self.key_width);
        self.lines.push(format!("{} {value}", style(padded).dim()));
        self
    }

    pub fn bullet(&mut self, text: &str) -> &mut Self {
        self.lines.push(format!("- {text}"));
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: HumanLayout) {
    println!("{}", layout.build());
}

/// Compact duration like `3h 12m` or `45s`.
#[must_use]
pub fn format_delta(delta: TimeDelta) -> String {
    let total = delta.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
