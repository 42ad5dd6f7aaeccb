use std::collections::HashMap;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::{CacheSettings, RoutingSettings};

/// Project configuration file
pub const CONFIG_FILE: &str = "intermediary.yaml";

/// Local overrides, not meant to be committed
pub const LOCAL_CONFIG_FILE: &str = "intermediary.local.yaml";

/// Environment variable prefix; `__` separates nested keys
pub const ENV_PREFIX: &str = "INTERMEDIARY_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid mailbox_capacity: {0}. Must be at least 1")]
    InvalidMailboxCapacity(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Invalid {agent} setting: {reason}")]
    InvalidAgentSetting { agent: &'static str, reason: String },
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. intermediary.yaml
    /// 3. intermediary.local.yaml (optional)
    /// 4. Environment variables (INTERMEDIARY_* prefix)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(CONFIG_FILE))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::finish(config)
    }

    /// Load configuration from a specific file, still honoring environment
    /// overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::finish(config)
    }

    fn finish(mut config: Config) -> Result<Config> {
        normalize_keys(&mut config.cache);
        normalize_keys(&mut config.routing);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.mailbox_capacity == 0 {
            return Err(ConfigError::InvalidMailboxCapacity(config.mailbox_capacity));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        // Agents would reject these at runtime; fail at startup instead
        CacheSettings::default()
            .merged(&config.cache)
            .map_err(|e| ConfigError::InvalidAgentSetting {
                agent: "cache",
                reason: e.to_string(),
            })?;
        RoutingSettings::default()
            .merged(&config.routing)
            .map_err(|e| ConfigError::InvalidAgentSetting {
                agent: "routing",
                reason: e.to_string(),
            })?;

        Ok(())
    }
}

/// Environment variables cannot carry `-`, so `CACHE_HOST` arrives as
/// `cache_host`; agent keys are hyphenated.
fn normalize_keys(settings: &mut HashMap<String, String>) {
    *settings = std::mem::take(settings)
        .into_iter()
        .map(|(k, v)| (k.to_lowercase().replace('_', "-"), v))
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_load_from_file() {
        let file = yaml_file(
            "cache:\n  cache-host: cache.local\n  timeout: 750ms\n  mon: 8-16\nrouting:\n  app-host: backend.local\n  log: false\nlogging:\n  level: debug\n",
        );

        let config = temp_env::with_vars_unset(
            ["INTERMEDIARY_LOGGING__LEVEL", "INTERMEDIARY_MAILBOX_CAPACITY"],
            || ConfigLoader::load_from_file(file.path()).unwrap(),
        );

        assert_eq!(config.cache["cache-host"], "cache.local");
        assert_eq!(config.cache["mon"], "8-16");
        assert_eq!(config.routing["log"], "false");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json", "default should persist");
        assert_eq!(config.mailbox_capacity, 64);
    }

    #[test]
    fn test_env_override() {
        let file = yaml_file("cache:\n  timeout: 750ms\n");

        let config = temp_env::with_vars(
            [
                ("INTERMEDIARY_MAILBOX_CAPACITY", Some("16")),
                ("INTERMEDIARY_CACHE__CACHE_HOST", Some("env-cache.local")),
                ("INTERMEDIARY_LOGGING__LEVEL", Some("warn")),
            ],
            || ConfigLoader::load_from_file(file.path()).unwrap(),
        );

        assert_eq!(config.mailbox_capacity, 16);
        assert_eq!(config.cache["cache-host"], "env-cache.local");
        assert_eq!(config.cache["timeout"], "750ms");
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_validate_zero_mailbox() {
        let config = Config {
            mailbox_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMailboxCapacity(0))
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn test_validate_invalid_agent_duration() {
        let mut config = Config::default();
        config
            .routing
            .insert("timeout".to_string(), "whenever".to_string());

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidAgentSetting { agent, reason } => {
                assert_eq!(agent, "routing");
                assert!(reason.contains("timeout"));
            }
            other => panic!("Expected InvalidAgentSetting error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_file_is_error() {
        let file = yaml_file("mailbox_capacity: [1, 2]\n");
        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }
}
