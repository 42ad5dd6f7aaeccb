use tracing::info;

use crate::domain::ports::{AccessLog, AccessRecord};

/// Access log that emits one structured `tracing` event per record under
/// the `access` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAccessLog;

impl AccessLog for TracingAccessLog {
    fn log(&self, record: &AccessRecord) {
        info!(
            target: "access",
            direction = record.direction.as_str(),
            start = %record.start.to_rfc3339(),
            elapsed_ms = u64::try_from(record.elapsed.as_millis()).unwrap_or(u64::MAX),
            route = %record.route,
            method = %record.method,
            url = %record.url,
            status = record.status,
            request_id = record.request_id.as_deref().unwrap_or("-"),
            timeout_ms = u64::try_from(record.timeout.as_millis()).unwrap_or(u64::MAX),
            timed_out = record.elapsed >= record.timeout && !record.timeout.is_zero(),
            "access"
        );
    }
}

/// Access log that discards records.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAccessLog;

impl AccessLog for NullAccessLog {
    fn log(&self, _record: &AccessRecord) {}
}
