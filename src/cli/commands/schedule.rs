//! `schedule` command: show the weekly cache schedule and whether caching
//! is active at a given instant.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc, Weekday};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{list_table, output, CommandOutput};
use crate::domain::models::config::{config_value, CACHE_HOST_KEY};
use crate::domain::models::schedule::weekday_key;
use crate::domain::models::{CacheSettings, Config};

const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Evaluate at this instant (RFC3339) instead of now
    #[arg(long)]
    pub at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DayOutput {
    pub day: &'static str,
    pub hours: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleOutput {
    pub cache_host: Option<String>,
    pub days: Vec<DayOutput>,
    pub unscheduled: &'static str,
    pub at: DateTime<Utc>,
    pub active: bool,
}

impl CommandOutput for ScheduleOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["day", "hours"]);
        for day in &self.days {
            table.add_row(vec![day.day, day.hours.as_deref().unwrap_or("-")]);
        }

        let active = if self.active {
            console::style("active").green().to_string()
        } else {
            console::style("inactive").yellow().to_string()
        };
        let mut lines = vec![
            format!(
                "Cache host: {}",
                self.cache_host.as_deref().unwrap_or("(not configured)")
            ),
            String::new(),
            table.to_string(),
            String::new(),
            format!("Unscheduled days: {}", self.unscheduled),
            format!("Caching at {}: {active}", self.at.to_rfc3339()),
        ];
        if self.cache_host.is_none() {
            lines.push("Requests bypass the cache until a cache host is configured.".to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn build_output(settings: &CacheSettings, cache_host: Option<String>, at: DateTime<Utc>) -> ScheduleOutput {
    let schedule = &settings.schedule;
    ScheduleOutput {
        cache_host,
        days: WEEK
            .iter()
            .map(|&day| DayOutput {
                day: weekday_key(day),
                hours: schedule.range(day).map(|r| r.to_string()),
            })
            .collect(),
        unscheduled: if schedule.is_empty() {
            "on (no schedule configured)"
        } else {
            schedule.unscheduled().as_str()
        },
        at,
        active: schedule.active_at(at),
    }
}

pub fn execute(args: ScheduleArgs, config: &Config, json_mode: bool) -> Result<()> {
    let at = match args.at {
        Some(at) => DateTime::parse_from_rfc3339(&at)
            .with_context(|| format!("invalid --at timestamp '{at}'"))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let settings = CacheSettings::default()
        .merged(&config.cache)
        .context("invalid cache settings")?;
    let cache_host = config_value(&config.cache, CACHE_HOST_KEY).map(str::to_string);

    output(&build_output(&settings, cache_host, at), json_mode);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    #[test]
    fn test_schedule_output() {
        let m: HashMap<String, String> = [
            ("mon".to_string(), "8-16".to_string()),
            ("tue".to_string(), "abc".to_string()),
        ]
        .into();
        let settings = CacheSettings::default().merged(&m).unwrap();
        // 2024-06-03 is a Monday
        let at = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();

        let out = build_output(&settings, Some("cache.local".to_string()), at);
        assert!(out.active);
        assert_eq!(out.days.len(), 7);
        assert_eq!(out.days[1].hours.as_deref(), Some("8-16"));
        assert_eq!(out.days[2].hours, None);
        assert_eq!(out.unscheduled, "off");

        let late = Utc.with_ymd_and_hms(2024, 6, 3, 17, 0, 0).unwrap();
        assert!(!build_output(&settings, None, late).active);
    }

    #[test]
    fn test_empty_schedule_is_always_active() {
        let at = Utc.with_ymd_and_hms(2024, 6, 5, 3, 0, 0).unwrap();
        let out = build_output(&CacheSettings::default(), None, at);
        assert!(out.active);
        assert!(out.to_human().contains("not configured"));
    }
}
