//! Status objects delivered to the notification collaborator and used as
//! configuration replies.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Serialize;

use crate::domain::errors::{ErrorKind, ExchangeError};

/// Outcome of an operation, attributed to the agent that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    /// HTTP-class status code (200 on success).
    #[serde(serialize_with = "serialize_code")]
    pub code: StatusCode,
    /// Failure class, `None` on success.
    pub kind: Option<ErrorKind>,
    /// Human-readable failure description.
    pub error: Option<String>,
    /// Name of the originating agent.
    pub agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: StatusCode::OK,
            kind: None,
            error: None,
            agent: None,
            timestamp: Utc::now(),
        }
    }

    pub fn from_error(err: &ExchangeError) -> Self {
        Self {
            code: err.status_code(),
            kind: Some(err.kind()),
            error: Some(err.to_string()),
            agent: None,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub const fn is_ok(&self) -> bool {
        self.kind.is_none()
    }
}

impl From<&ExchangeError> for Status {
    fn from(err: &ExchangeError) -> Self {
        Self::from_error(err)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] [{}]",
            self.timestamp.to_rfc3339(),
            self.agent.as_deref().unwrap_or("-"),
            self.code.as_u16()
        )?;
        if let (Some(kind), Some(error)) = (self.kind, self.error.as_deref()) {
            write!(f, " [{kind}] [{error}]")?;
        }
        Ok(())
    }
}

fn serialize_code<S: serde::Serializer>(code: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(code.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_status() {
        let status = Status::ok();
        assert!(status.is_ok());
        assert_eq!(status.code, StatusCode::OK);
    }

    #[test]
    fn test_error_status_keeps_kind_and_agent() {
        let err = ExchangeError::InvalidArgument("host configuration is empty".into());
        let status = Status::from_error(&err).with_agent("routing");

        assert!(!status.is_ok());
        assert_eq!(status.kind, Some(ErrorKind::InvalidArgument));
        assert_eq!(status.code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status.agent.as_deref(), Some("routing"));
        assert!(status.to_string().contains("host configuration is empty"));
    }

    #[test]
    fn test_status_serializes_numeric_code() {
        let json = serde_json::to_value(Status::ok()).unwrap();
        assert_eq!(json["code"], 200);
        assert!(json["kind"].is_null());
    }
}
