//! Domain errors for the intermediary agents.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use thiserror::Error;

use super::models::exchange::{format_duration, ExchangeResponse, TIMEOUT_HEADER};

/// Broad classification of an exchange failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed construction input (unbuildable request, missing host).
    InvalidArgument,
    /// Body read or write failure.
    Io,
    /// Outbound call exceeded its bound.
    Timeout,
    /// Non-2xx or transport failure from the cache store or backend.
    Upstream,
    /// Missing or malformed configuration key.
    Config,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid argument",
            Self::Io => "io error",
            Self::Timeout => "timeout",
            Self::Upstream => "upstream error",
            Self::Config => "config error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while executing an exchange.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("body read failed: {0}")]
    Io(String),

    #[error("request exceeded timeout of {}", format_duration(*.0))]
    Timeout(Duration),

    #[error("upstream error ({status}): {message}")]
    Upstream { status: StatusCode, message: String },

    #[error("invalid configuration for '{key}': {reason}")]
    Config { key: String, reason: String },
}

impl ExchangeError {
    /// Shorthand for a configuration error on `key`.
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Io(_) => ErrorKind::Io,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// HTTP status a caller should see for this failure.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Upstream { status, .. } => *status,
            Self::InvalidArgument(_) | Self::Io(_) | Self::Config { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Synthesize the response paired with this error.
    ///
    /// Timeouts carry the timeout marker header with the bound that was
    /// exceeded.
    pub fn to_response(&self) -> ExchangeResponse {
        let mut headers = HeaderMap::new();
        if let Self::Timeout(after) = self {
            if let Ok(value) = HeaderValue::from_str(&format_duration(*after)) {
                headers.insert(TIMEOUT_HEADER, value);
            }
        }
        ExchangeResponse::with_body(self.status_code(), headers, self.to_string())
    }

    /// Classify a reqwest failure.
    pub fn from_transport(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            return Self::Timeout(timeout);
        }
        if err.is_builder() {
            return Self::InvalidArgument(err.to_string());
        }
        if err.is_body() || err.is_decode() {
            return Self::Io(err.to_string());
        }
        Self::Upstream {
            status: err.status().unwrap_or(StatusCode::BAD_GATEWAY),
            message: err.to_string(),
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ExchangeError::InvalidArgument("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ExchangeError::Timeout(Duration::from_millis(750)).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ExchangeError::Upstream {
                status: StatusCode::BAD_GATEWAY,
                message: "refused".into()
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_timeout_response_carries_marker() {
        let resp = ExchangeError::Timeout(Duration::from_millis(750)).to_response();
        assert_eq!(resp.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(resp.headers.get(TIMEOUT_HEADER).unwrap(), "750ms");
    }

    #[test]
    fn test_config_error_message() {
        let err = ExchangeError::config("timeout", "invalid duration 'abc'");
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(
            err.to_string(),
            "invalid configuration for 'timeout': invalid duration 'abc'"
        );
    }
}
