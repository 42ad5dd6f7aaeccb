//! Infrastructure layer module
//!
//! Adapters for the world outside the agents:
//! - reqwest-backed network transport
//! - Configuration loading with figment
//! - Logging with tracing-subscriber and tracing-appender

pub mod config;
pub mod http;
pub mod logging;
