//! Weekly cache admission schedule.
//!
//! A schedule maps each weekday to an inclusive range of UTC hours during
//! which cache-aside is allowed. Configuration supplies ranges as `"H-H"`
//! tokens under the keys `sun` .. `sat`.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

pub const SUNDAY_KEY: &str = "sun";
pub const MONDAY_KEY: &str = "mon";
pub const TUESDAY_KEY: &str = "tue";
pub const WEDNESDAY_KEY: &str = "wed";
pub const THURSDAY_KEY: &str = "thu";
pub const FRIDAY_KEY: &str = "fri";
pub const SATURDAY_KEY: &str = "sat";

/// Weekday keys in `Weekday::num_days_from_sunday` order.
pub const WEEKDAY_KEYS: [&str; 7] = [
    SUNDAY_KEY,
    MONDAY_KEY,
    TUESDAY_KEY,
    WEDNESDAY_KEY,
    THURSDAY_KEY,
    FRIDAY_KEY,
    SATURDAY_KEY,
];

const RANGE_SEPARATOR: char = '-';
const MAX_HOUR: u8 = 23;

/// Configuration key for a weekday.
pub fn weekday_key(day: Weekday) -> &'static str {
    WEEKDAY_KEYS[day.num_days_from_sunday() as usize]
}

/// Inclusive range of hours within a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HourRange {
    pub from: u8,
    pub to: u8,
}

impl HourRange {
    pub const EMPTY: Self = Self { from: 0, to: 0 };

    pub const fn new(from: u8, to: u8) -> Self {
        Self { from, to }
    }

    /// Parse an `"H-H"` token. Anything malformed yields [`HourRange::EMPTY`].
    pub fn parse(s: &str) -> Self {
        let mut tokens = s.trim().split(RANGE_SEPARATOR);
        let (Some(from), Some(to), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            return Self::EMPTY;
        };
        match (from.trim().parse::<u8>(), to.trim().parse::<u8>()) {
            (Ok(from), Ok(to)) => Self { from, to },
            _ => Self::EMPTY,
        }
    }

    /// A range ending at hour 0, ending past hour 23, or running backwards
    /// admits nothing.
    pub const fn is_empty(&self) -> bool {
        self.to == 0 || self.to > MAX_HOUR || self.from > self.to
    }

    pub const fn contains(&self, hour: u32) -> bool {
        !self.is_empty() && self.from as u32 <= hour && hour <= self.to as u32
    }
}

impl std::fmt::Display for HourRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{RANGE_SEPARATOR}{}", self.from, self.to)
    }
}

/// What to do on a weekday without a configured range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnscheduledPolicy {
    /// Cache on unscheduled days.
    On,
    /// Bypass the cache on unscheduled days.
    #[default]
    Off,
}

impl UnscheduledPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "on" | "true" | "cache" => Some(Self::On),
            "off" | "false" | "bypass" => Some(Self::Off),
            _ => None,
        }
    }
}

/// Per-weekday hour ranges.
///
/// An empty schedule places no restriction on caching. Once any weekday is
/// configured, weekdays without a range follow the [`UnscheduledPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Schedule {
    days: [Option<HourRange>; 7],
    unscheduled: UnscheduledPolicy,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(m: &HashMap<String, String>) -> Self {
        let mut schedule = Self::new();
        schedule.update(m);
        schedule
    }

    /// Apply weekday keys from `m`. Omitted, empty and malformed entries
    /// leave the existing range for that day in place.
    pub fn update(&mut self, m: &HashMap<String, String>) {
        for (idx, key) in WEEKDAY_KEYS.iter().enumerate() {
            let Some(token) = m.get(*key).filter(|s| !s.trim().is_empty()) else {
                continue;
            };
            let range = HourRange::parse(token);
            if !range.is_empty() {
                self.days[idx] = Some(range);
            }
        }
    }

    #[must_use]
    pub fn with_day(mut self, day: Weekday, range: HourRange) -> Self {
        self.set(day, range);
        self
    }

    /// Set a day's range; an empty range clears the day.
    pub fn set(&mut self, day: Weekday, range: HourRange) {
        let idx = day.num_days_from_sunday() as usize;
        self.days[idx] = (!range.is_empty()).then_some(range);
    }

    pub fn range(&self, day: Weekday) -> Option<HourRange> {
        self.days[day.num_days_from_sunday() as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }

    pub const fn unscheduled(&self) -> UnscheduledPolicy {
        self.unscheduled
    }

    pub fn set_unscheduled(&mut self, policy: UnscheduledPolicy) {
        self.unscheduled = policy;
    }

    /// Whether caching is allowed at `ts`.
    pub fn active_at(&self, ts: DateTime<Utc>) -> bool {
        if self.is_empty() {
            return true;
        }
        match self.range(ts.weekday()) {
            Some(range) => range.contains(ts.hour()),
            None => self.unscheduled == UnscheduledPolicy::On,
        }
    }

    /// Whether caching is allowed right now (UTC).
    pub fn now(&self) -> bool {
        self.active_at(Utc::now())
    }
}
