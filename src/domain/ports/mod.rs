//! Ports (interfaces) consumed by the agents.

pub mod access_log;
pub mod exchange;
pub mod notifier;
pub mod schedule_source;

pub use access_log::{AccessLog, AccessRecord, Direction};
pub use exchange::{chain, exchange_fn, Exchange, ExchangeFn, Link, SharedExchange};
pub use notifier::Notifier;
pub use schedule_source::{FixedSchedule, ScheduleSource};
