pub mod config;
pub mod exchange;
pub mod message;
pub mod schedule;
pub mod status;

pub use config::{CacheSettings, Config, LoggingConfig, RoutingSettings};
pub use exchange::{
    Body, ExchangeRequest, ExchangeResponse, CACHED_HEADER, REQUEST_ID_HEADER, TIMEOUT_HEADER,
};
pub use message::{ConfigContent, LifecycleState, Message};
pub use schedule::{HourRange, Schedule, UnscheduledPolicy};
pub use status::Status;
