//! Context-aware error suggestions.
//!
//! Complements the static suggestions in the `codes` module with hints that
//! mention the operation, sub-stage or config key involved.

use serde_json::Value;

use super::codes::ErrorCode;

/// Generate a context-aware suggestion for an error.
///
/// Falls back to [`ErrorCode::suggestion`] when the context carries nothing
/// more specific.
pub fn suggest_for_error(code: ErrorCode, context: Option<&Value>) -> String {
    match code {
        ErrorCode::OperationNotFound => suggest_operation_not_found(context),
        ErrorCode::OperationExists => suggest_operation_exists(context),
        ErrorCode::SubStageNotFound | ErrorCode::SubStageOutOfOrder => {
            suggest_sub_stage(code, context)
        }
        ErrorCode::SubSessionMissing => suggest_sub_session_missing(context),
        ErrorCode::ConfigMissingRequired => suggest_config_missing_required(context),
        ErrorCode::ApiRateLimited | ErrorCode::ApiServerError | ErrorCode::NetworkTimeout => {
            suggest_retryable_api(code, context)
        }
        _ => code.suggestion().to_string(),
    }
}

fn context_str<'a>(context: Option<&'a Value>, key: &str) -> Option<&'a str> {
    context.and_then(|c| c.get(key)).and_then(Value::as_str)
}

fn suggest_operation_not_found(context: Option<&Value>) -> String {
    match context_str(context, "operation_id") {
        Some(id) => format!(
            "No operation '{id}' is being tracked. It may have finished and been cleared, or it was never started"
        ),
        None => ErrorCode::OperationNotFound.suggestion().to_string(),
    }
}

fn suggest_operation_exists(context: Option<&Value>) -> String {
    match context_str(context, "operation_id") {
        Some(id) => format!(
            "Operation '{id}' is still running. Cancel it or wait for it to finish before starting it again"
        ),
        None => ErrorCode::OperationExists.suggestion().to_string(),
    }
}

fn suggest_sub_stage(code: ErrorCode, context: Option<&Value>) -> String {
    match (
        context_str(context, "operation_id"),
        context_str(context, "sub_stage"),
    ) {
        (Some(op), Some(stage)) if code == ErrorCode::SubStageNotFound => format!(
            "Operation '{op}' has no sub-stage named '{stage}'. Use a name it was started with"
        ),
        (Some(op), Some(stage)) => format!(
            "Sub-stage '{stage}' of '{op}' cannot change yet. Finish the earlier sub-stages first"
        ),
        _ => code.suggestion().to_string(),
    }
}

fn suggest_sub_session_missing(context: Option<&Value>) -> String {
    match context_str(context, "sub_session") {
        Some("upload") => "Upload a video first with `movemint upload <file>`".to_string(),
        Some("analysis") => "Run `movemint analyze <video-id>` after the upload finishes".to_string(),
        Some(kind) => format!(
            "The current session has no {kind} step yet. Run `movemint session resume` to see where to continue"
        ),
        None => ErrorCode::SubSessionMissing.suggestion().to_string(),
    }
}

fn suggest_config_missing_required(context: Option<&Value>) -> String {
    match context_str(context, "config_key") {
        Some(key) => {
            let env = format!("MOVEMINT_{}", key.replace('.', "_").to_uppercase());
            format!("Set `{key}` in config.toml or export {env}")
        }
        None => ErrorCode::ConfigMissingRequired.suggestion().to_string(),
    }
}

fn suggest_retryable_api(code: ErrorCode, context: Option<&Value>) -> String {
    let status = context
        .and_then(|c| c.get("status"))
        .and_then(Value::as_u64);
    match status {
        Some(429) => "The minting engine is rate limiting requests. Wait a minute, then retry".to_string(),
        Some(status) if status >= 500 => format!(
            "The minting engine returned HTTP {status}. Retries were exhausted; try again in a few minutes"
        ),
        _ => code.suggestion().to_string(),
    }
}
