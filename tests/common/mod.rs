//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple integration
//! test files.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use intermediary::domain::models::schedule::weekday_key;
use intermediary::services::NullAccessLog;
use intermediary::{AgentOptions, EventNotifier, SharedExchange};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Wait for a condition to be true with timeout
///
/// Polls the predicate every 10ms until it returns true or timeout is reached.
#[allow(dead_code)]
pub async fn wait_for<F>(mut predicate: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_millis(timeout_ms);

    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    predicate()
}

/// Agent options wired to a subscribable notifier and the given transport.
#[allow(dead_code)]
pub fn test_options(transport: SharedExchange) -> (AgentOptions, Arc<EventNotifier>) {
    let notifier = Arc::new(EventNotifier::default());
    let options = AgentOptions::new(transport)
        .with_notifier(notifier.clone())
        .with_access_log(Arc::new(NullAccessLog));
    (options, notifier)
}

/// Build a settings map.
#[allow(dead_code)]
pub fn settings(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Settings that schedule caching only on the day after today. Today is
/// unscheduled and follows the default policy, so caching is off right now.
#[allow(dead_code)]
pub fn closed_today() -> HashMap<String, String> {
    let tomorrow = Utc::now().weekday().succ();
    settings(&[(weekday_key(tomorrow), "0-23")])
}
