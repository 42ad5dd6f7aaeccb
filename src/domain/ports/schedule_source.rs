use crate::domain::errors::ExchangeResult;
use crate::domain::models::schedule::Schedule;

/// Supplies the weekly schedule the cache agent evaluates on each tick.
///
/// When no source is installed the agent uses the schedule from its own
/// settings. A failing source leaves the enabled flag untouched.
pub trait ScheduleSource: Send + Sync {
    fn resolve(&self) -> ExchangeResult<Schedule>;
}

/// Source returning a fixed schedule.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedSchedule(pub Schedule);

impl ScheduleSource for FixedSchedule {
    fn resolve(&self) -> ExchangeResult<Schedule> {
        Ok(self.0)
    }
}
