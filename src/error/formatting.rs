//! Error formatting utilities
//!
//! Renders errors for human-readable logs and for structured log fields.

use crate::Error;
use std::error::Error as StdError;

/// Format error for display
///
/// Adds service details (status, retry hint) and appends nested error causes.
pub fn format_error(error: &Error) -> String {
    let formatted = match error {
        Error::Service(e) => {
            let hint = e
                .retry_after
                .map(|d| format!(" (retry after {}s)", d.as_secs_f64()))
                .unwrap_or_default();
            format!("{}[{}]: {}{}", e.kind, e.status, e.message, hint)
        }

        Error::Transport { message, timeout } => {
            if *timeout {
                format!("Transport timeout: {}", message)
            } else {
                format!("Transport error: {}", message)
            }
        }

        Error::TimedOut {
            identity,
            attempts,
            elapsed,
        } => format!(
            "Gave up on {} after {} polls in {:.1}s",
            identity,
            attempts,
            elapsed.as_secs_f64()
        ),

        Error::Validation {
            field,
            message,
            value,
        } => match value {
            Some(val) => format!(
                "Validation failed for {} (value: '{}'): {}",
                field, val, message
            ),
            None => format!("Validation failed for {}: {}", field, message),
        },

        // For standard errors, use their Display implementation
        _ => error.to_string(),
    };

    let mut result = formatted;
    let mut source = error.source();

    while let Some(cause) = source {
        if !result.contains(&cause.to_string()) {
            result = format!("{} (caused by {})", result, cause);
        }
        source = cause.source();
    }

    result
}

/// Format error for logging with structured data
pub fn format_error_for_logging(error: &Error) -> serde_json::Value {
    let mut log_data = serde_json::json!({
        "message": format_error(error),
        "category": error.category(),
        "retryable": error.is_retryable(),
    });

    match error {
        Error::Service(e) => {
            log_data["status"] = serde_json::Value::Number(e.status.into());
            if let Some(after) = e.retry_after {
                log_data["retry_after_ms"] =
                    serde_json::Value::Number((after.as_millis() as u64).into());
            }
            if let Some(body) = &e.raw_body {
                log_data["raw_body"] = serde_json::Value::String(body.clone());
            }
        }
        Error::TimedOut { attempts, .. } => {
            log_data["attempts"] = serde_json::Value::Number((*attempts).into());
        }
        _ => {}
    }

    log_data
}
