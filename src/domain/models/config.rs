use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::exchange::parse_duration;
use super::schedule::{Schedule, UnscheduledPolicy};
use crate::domain::errors::{ExchangeError, ExchangeResult};

pub const CACHE_HOST_KEY: &str = "cache-host";
pub const APP_HOST_KEY: &str = "app-host";
pub const TIMEOUT_KEY: &str = "timeout";
pub const INTERVAL_KEY: &str = "interval";
pub const CACHE_CONTROL_KEY: &str = "cache-control";
pub const UNSCHEDULED_KEY: &str = "unscheduled";
pub const LOG_KEY: &str = "log";
pub const ROUTE_NAME_KEY: &str = "route-name";

pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_ROUTING_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_LOG_ROUTE_NAME: &str = "app";

/// Non-empty, trimmed value for `key`.
pub fn config_value<'a>(m: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    m.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn duration_value(m: &HashMap<String, String>, key: &str) -> ExchangeResult<Option<Duration>> {
    config_value(m, key)
        .map(|s| {
            parse_duration(s)
                .ok_or_else(|| ExchangeError::config(key, format!("invalid duration '{s}'")))
        })
        .transpose()
}

/// Typed settings of the cache agent.
///
/// The cache-store host lives in the agent's route table, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub timeout: Duration,
    pub interval: Duration,
    /// Directive sent to the cache store on write-back.
    pub cache_control: Option<String>,
    pub schedule: Schedule,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CACHE_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            cache_control: None,
            schedule: Schedule::new(),
        }
    }
}

impl CacheSettings {
    /// Copy of these settings with the recognized keys of `m` applied.
    ///
    /// Fails without partial application if a duration or policy value is
    /// malformed. Malformed weekday ranges are dropped silently.
    pub fn merged(&self, m: &HashMap<String, String>) -> ExchangeResult<Self> {
        let mut next = self.clone();
        if let Some(timeout) = duration_value(m, TIMEOUT_KEY)? {
            next.timeout = timeout;
        }
        if let Some(interval) = duration_value(m, INTERVAL_KEY)? {
            if interval.is_zero() {
                return Err(ExchangeError::config(INTERVAL_KEY, "interval must be positive"));
            }
            next.interval = interval;
        }
        if let Some(directive) = config_value(m, CACHE_CONTROL_KEY) {
            next.cache_control = Some(directive.to_string());
        }
        if let Some(policy) = config_value(m, UNSCHEDULED_KEY) {
            let policy = UnscheduledPolicy::from_str(policy).ok_or_else(|| {
                ExchangeError::config(UNSCHEDULED_KEY, format!("expected on or off, got '{policy}'"))
            })?;
            next.schedule.set_unscheduled(policy);
        }
        next.schedule.update(m);
        Ok(next)
    }
}

/// Typed settings of the routing agent.
///
/// The backend host lives in the agent's route table, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingSettings {
    /// Emit access records for forwarded calls.
    pub log: bool,
    /// Route name written into access records.
    pub route_name: String,
    pub timeout: Duration,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            log: true,
            route_name: DEFAULT_LOG_ROUTE_NAME.to_string(),
            timeout: DEFAULT_ROUTING_TIMEOUT,
        }
    }
}

impl RoutingSettings {
    pub fn merged(&self, m: &HashMap<String, String>) -> ExchangeResult<Self> {
        let mut next = self.clone();
        if let Some(log) = config_value(m, LOG_KEY) {
            next.log = log == "true";
        }
        if let Some(route_name) = config_value(m, ROUTE_NAME_KEY) {
            next.route_name = route_name.to_string();
        }
        if let Some(timeout) = duration_value(m, TIMEOUT_KEY)? {
            next.timeout = timeout;
        }
        Ok(next)
    }
}

/// Process-level configuration, loaded by
/// [`ConfigLoader`](crate::infrastructure::config::ConfigLoader).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Configuration map delivered to the cache agent
    #[serde(default, deserialize_with = "settings_map")]
    pub cache: HashMap<String, String>,

    /// Configuration map delivered to the routing agent
    #[serde(default, deserialize_with = "settings_map")]
    pub routing: HashMap<String, String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Capacity of each agent's mailbox
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
}

/// Accept scalar values of any type in agent settings maps, so YAML such as
/// `log: true` or `timeout: 750` reads as text.
fn settings_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    HashMap::<String, Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(D::Error::custom(format!("setting '{key}' must be a scalar")));
                }
            };
            Ok((key, text))
        })
        .collect()
}

const fn default_mailbox_capacity() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: HashMap::new(),
            routing: HashMap::new(),
            logging: LoggingConfig::default(),
            mailbox_capacity: default_mailbox_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for log files (optional, if None logs only to the console)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Log to stderr, keeping stdout for command output
    #[serde(default = "default_true")]
    pub enable_console: bool,

    /// Log rotation policy (daily, hourly, never)
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            enable_console: true,
            rotation: default_rotation(),
        }
    }
}
