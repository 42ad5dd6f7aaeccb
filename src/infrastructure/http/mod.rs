//! Network transport for outbound exchanges.

pub mod transport;

pub use transport::{HttpTransport, HttpTransportConfig};
