//! Access-log port.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Traffic direction relative to the intermediary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ingress => "ingress",
            Self::Egress => "egress",
        }
    }
}

/// One completed outbound (or inbound) call.
#[derive(Debug, Clone, Serialize)]
pub struct AccessRecord {
    pub direction: Direction,
    pub start: DateTime<Utc>,
    #[serde(with = "millis")]
    pub elapsed: Duration,
    pub route: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub request_id: Option<String>,
    /// Timeout threshold used for downstream alerting.
    #[serde(with = "millis")]
    pub timeout: Duration,
}

/// Best-effort access logging; implementations swallow their own failures.
pub trait AccessLog: Send + Sync {
    fn log(&self, record: &AccessRecord);
}

mod millis {
    use std::time::Duration;

    pub fn serialize<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}
