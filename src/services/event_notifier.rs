//! Notification sinks for agent status objects.
//!
//! `EventNotifier` fans statuses out over a broadcast channel so any number
//! of observers can subscribe; publishing never blocks, and statuses are
//! dropped when nobody is listening.

use tokio::sync::broadcast;
use tracing::warn;

use crate::domain::models::Status;
use crate::domain::ports::Notifier;

/// Configuration for the EventNotifier.
#[derive(Debug, Clone)]
pub struct EventNotifierConfig {
    /// Broadcast channel capacity.
    pub channel_capacity: usize,
    /// Also emit a warning log line per failed status.
    pub log_statuses: bool,
}

impl Default for EventNotifierConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            log_statuses: true,
        }
    }
}

/// Broadcast-based notifier.
pub struct EventNotifier {
    sender: broadcast::Sender<Status>,
    config: EventNotifierConfig,
}

impl EventNotifier {
    pub fn new(config: EventNotifierConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self { sender, config }
    }

    /// Subscribe to statuses published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Status> {
        self.sender.subscribe()
    }
}

impl Default for EventNotifier {
    fn default() -> Self {
        Self::new(EventNotifierConfig::default())
    }
}

impl Notifier for EventNotifier {
    fn notify(&self, status: Status) {
        if self.config.log_statuses {
            log_status(&status);
        }
        // Err only means there are no subscribers
        let _ = self.sender.send(status);
    }
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, status: Status) {
        log_status(&status);
    }
}

fn log_status(status: &Status) {
    warn!(
        agent = status.agent.as_deref().unwrap_or("-"),
        code = status.code.as_u16(),
        kind = status.kind.map(|k| k.as_str()),
        error = status.error.as_deref(),
        "agent status"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ExchangeError;

    #[tokio::test]
    async fn test_subscribers_receive_statuses() {
        let notifier = EventNotifier::default();
        let mut rx = notifier.subscribe();

        let err = ExchangeError::Io("connection reset".into());
        notifier.notify(Status::from_error(&err).with_agent("cache"));

        let status = rx.recv().await.unwrap();
        assert_eq!(status.agent.as_deref(), Some("cache"));
        assert!(!status.is_ok());
    }

    #[test]
    fn test_notify_without_subscribers_does_not_fail() {
        let notifier = EventNotifier::default();
        notifier.notify(Status::ok());

        // Later subscribers only see later statuses
        let mut rx = notifier.subscribe();
        assert!(rx.try_recv().is_err());
        TracingNotifier.notify(Status::ok());
    }
}
