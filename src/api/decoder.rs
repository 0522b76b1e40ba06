//! Response decoding
//!
//! Maps a status code and raw body onto either the expected value or exactly
//! one [`ServiceError`]. Decoding is total: every status code has an outcome.

use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{ErrorKind, ServiceError};
use crate::transport::RawResponse;

/// Classify a response by status code
///
/// Returns `None` only for 200; every other status maps to one error kind.
pub fn classify(response: &RawResponse) -> Option<ServiceError> {
    let kind = match response.status {
        200 => return None,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::Conflict,
        429 => ErrorKind::RateLimited,
        401 | 403 => ErrorKind::Unauthorized,
        500..=599 => ErrorKind::ServiceUnavailable,
        _ => ErrorKind::MalformedResponse,
    };

    let body = parse_body(&response.body);
    let message = body
        .as_ref()
        .and_then(body_message)
        .unwrap_or_else(|| default_message(kind, response.status));

    let mut error = ServiceError::new(kind, response.status, message);
    match kind {
        ErrorKind::RateLimited => {
            let hint = response
                .retry_after
                .or_else(|| body.as_ref().and_then(body_retry_after));
            error = error.with_retry_after(hint);
        }
        ErrorKind::MalformedResponse => {
            error = error.with_raw_body(response.body.clone());
        }
        _ => {}
    }
    // 409 bodies describe the job in progress; the client reads them
    if kind == ErrorKind::Conflict && !response.body.is_empty() {
        error = error.with_raw_body(response.body.clone());
    }

    Some(error)
}

/// Decode a 200 response into `T`, or classify the failure
pub fn decode<T: DeserializeOwned>(response: &RawResponse) -> Result<T, ServiceError> {
    if let Some(error) = classify(response) {
        return Err(error);
    }

    serde_json::from_str(&response.body).map_err(|e| {
        ServiceError::new(
            ErrorKind::MalformedResponse,
            response.status,
            format!("Unexpected response shape: {}", e),
        )
        .with_raw_body(response.body.clone())
    })
}

fn parse_body(body: &str) -> Option<serde_json::Value> {
    if body.trim().is_empty() {
        return None;
    }
    serde_json::from_str(body).ok()
}

fn body_message(body: &serde_json::Value) -> Option<String> {
    ["reason", "message", "error", "title"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn body_retry_after(body: &serde_json::Value) -> Option<Duration> {
    ["retryAfter", "retry_after"]
        .iter()
        .find_map(|key| body.get(*key).and_then(|v| v.as_f64()))
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

fn default_message(kind: ErrorKind, status: u16) -> String {
    match kind {
        ErrorKind::NotFound => "Map has not been generated".to_string(),
        ErrorKind::Conflict => "Map generation already in progress".to_string(),
        ErrorKind::RateLimited => "Rate limit exceeded".to_string(),
        ErrorKind::Unauthorized => "API key rejected".to_string(),
        ErrorKind::ServiceUnavailable => format!("Service unavailable (HTTP {})", status),
        ErrorKind::MalformedResponse => format!("Unexpected HTTP status {}", status),
    }
}
