use crate::domain::models::status::Status;

/// Sink for status objects produced by agents.
///
/// Implementations must be fire-and-forget: `notify` never blocks and never
/// fails the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, status: Status);
}
