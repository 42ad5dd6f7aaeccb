//! Domain layer: exchange values, schedule and settings models, errors and
//! the ports the agents depend on.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ErrorKind, ExchangeError, ExchangeResult};
