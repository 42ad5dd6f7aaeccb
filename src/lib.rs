//! Intermediary - HTTP intermediary agents
//!
//! Two agents compose into a request pipeline: a cache agent that serves GET
//! requests cache-aside from an HTTP-addressable cache store, gated by a
//! weekly schedule, and a routing agent that forwards requests to a single
//! backend host under a timeout.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): exchange values, settings, errors and ports
//! - **Service Layer** (`services`): agent runtime, agents and collaborators
//! - **Infrastructure Layer** (`infrastructure`): network transport,
//!   configuration loading, logging
//! - **Adapters** (`adapters`): in-process cache store and echo backend
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use intermediary::{chain, CacheAgent, Link, Message, RoutingAgent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = CacheAgent::new()?;
//!     let routing = RoutingAgent::new()?;
//!     cache.send(Message::config_map([("cache-host", "cache.local")]));
//!     routing.send(Message::config_map([("app-host", "backend.local")]));
//!     cache.send(Message::Startup);
//!     routing.send(Message::Startup);
//!
//!     let pipeline = chain(&[&cache], routing.link(None));
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::{EchoBackend, MemoryCacheStore};
pub use domain::models::{
    CacheSettings, Config, ConfigContent, ExchangeRequest, ExchangeResponse, HourRange,
    LifecycleState, LoggingConfig, Message, RoutingSettings, Schedule, Status,
};
pub use domain::ports::{chain, exchange_fn, Exchange, Link, Notifier, SharedExchange};
pub use domain::{ErrorKind, ExchangeError, ExchangeResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::http::HttpTransport;
pub use services::{AgentOptions, CacheAgent, EventNotifier, RoutingAgent};
