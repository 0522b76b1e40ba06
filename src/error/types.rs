//! Error types for the rustmaps client
//!
//! Separates well-formed error responses from the service ([`ServiceError`])
//! from connectivity failures and from the terminal outcomes of a poll
//! session (timeout, cancellation, server-side generation failure).

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::types::MapIdentity;

/// Classification of an error response returned by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 404: the requested map (or resource) does not exist yet
    NotFound,
    /// 409: a generation request already exists for the identity
    Conflict,
    /// 429: too many requests
    RateLimited,
    /// 401/403: the API key was rejected
    Unauthorized,
    /// 5xx: the service is unable to answer right now
    ServiceUnavailable,
    /// Any other status, or a body that does not match the expected shape
    MalformedResponse,
}

impl ErrorKind {
    /// Whether waiting and retrying can resolve this kind of error
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::RateLimited | ErrorKind::ServiceUnavailable)
    }

    /// Stable name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::MalformedResponse => "malformed_response",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A well-formed error response from the service
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rustmaps returned {kind} (HTTP {status}): {message}")]
pub struct ServiceError {
    /// Error classification
    pub kind: ErrorKind,
    /// Raw HTTP status code
    pub status: u16,
    /// Message extracted from the body, or a generic description
    pub message: String,
    /// Delay the service asked us to wait before retrying
    pub retry_after: Option<Duration>,
    /// Raw payload, kept for diagnostics of malformed responses
    pub raw_body: Option<String>,
}

impl ServiceError {
    /// Create a service error without retry hint or raw payload
    pub fn new(kind: ErrorKind, status: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            retry_after: None,
            raw_body: None,
        }
    }

    /// Attach a retry-after hint
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Attach the raw response payload
    pub fn with_raw_body(mut self, body: impl Into<String>) -> Self {
        self.raw_body = Some(body.into());
        self
    }
}

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    /// Error response from the service
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Connectivity failure: DNS, connect, TLS or request timeout
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the failure
        message: String,
        /// Whether the failure was a client-side request timeout
        timeout: bool,
    },

    /// The service reported that map generation failed
    #[error("Map generation failed for {identity}: {reason}")]
    GenerationFailed {
        /// Map that failed to generate
        identity: MapIdentity,
        /// Reason reported by the service, if any
        reason: String,
    },

    /// The caller-imposed wait budget ran out before a terminal state
    #[error("Timed out waiting for {identity} after {attempts} polls ({elapsed:?})")]
    TimedOut {
        /// Map being waited on
        identity: MapIdentity,
        /// Number of polls performed
        attempts: u32,
        /// Wall-clock time spent in the session
        elapsed: Duration,
    },

    /// The caller cancelled the wait
    #[error("Wait for {identity} was cancelled")]
    Cancelled {
        /// Map being waited on
        identity: MapIdentity,
    },

    /// TOML configuration parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error in {field}: {message}")]
    Config {
        /// The configuration field that has an error
        field: String,
        /// Error message describing the issue
        message: String,
    },

    /// Validation errors
    #[error("Validation failed for {field}: {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Error message describing the validation failure
        message: String,
        /// The invalid value that caused the validation to fail
        value: Option<String>,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
            timeout: false,
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(field: S, message: S) -> Self {
        Self::Config {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Create a validation error that records the rejected value
    pub fn validation_with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
            value: Some(value.to_string()),
        }
    }

    /// Kind of the underlying service error, if this is one
    pub fn service_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Service(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Retry-after hint carried by a rate-limit response
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Service(e) => e.retry_after,
            _ => None,
        }
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Service(e) => e.kind.is_retryable(),
            Error::Transport { .. } => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Service(e) => e.kind.as_str(),
            Error::Transport { .. } => "transport",
            Error::GenerationFailed { .. } => "generation_failed",
            Error::TimedOut { .. } => "timed_out",
            Error::Cancelled { .. } => "cancelled",
            Error::Toml(..) => "toml",
            Error::Url(..) => "url",
            Error::Io(..) => "io",
            Error::Config { .. } => "config",
            Error::Validation { .. } => "validation",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport {
            message: e.to_string(),
            timeout: e.is_timeout(),
        }
    }
}
