// src/models/settings.rs
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const WEEKDAYS: [&str; 7] = [
    "MONDAY",
    "TUESDAY",
    "WEDNESDAY",
    "THURSDAY",
    "FRIDAY",
    "SATURDAY",
    "SUNDAY",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSettings {
    pub language_preference: String,
    pub timezone: String,
    pub email_preferences: Value,
}

/// Settings patch. Only keys present in the request are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSettingsUpdate {
    pub language_preference: Option<String>,
    pub timezone: Option<String>,
    pub email_preferences: Option<Value>,
}

/// Working hours and activity window for outreach
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkingHoursSettings {
    #[serde(default = "default_working_days")]
    pub working_days: BTreeMap<String, bool>,
    /// 24-hour `HH:MM`
    #[serde(default = "default_start_time")]
    pub start_time: String,
    #[serde(default = "default_end_time")]
    pub end_time: String,
    #[serde(default)]
    pub daily_custom_mode: bool,
}

impl Default for WorkingHoursSettings {
    fn default() -> Self {
        Self {
            working_days: default_working_days(),
            start_time: default_start_time(),
            end_time: default_end_time(),
            daily_custom_mode: false,
        }
    }
}

fn default_working_days() -> BTreeMap<String, bool> {
    WEEKDAYS
        .iter()
        .map(|day| (day.to_string(), !matches!(*day, "SATURDAY" | "SUNDAY")))
        .collect()
}

fn default_start_time() -> String {
    "09:00".to_string()
}

fn default_end_time() -> String {
    "17:00".to_string()
}

impl WorkingHoursSettings {
    pub fn validate(&self) -> Result<(), String> {
        for day in self.working_days.keys() {
            if !WEEKDAYS.contains(&day.as_str()) {
                return Err(format!("Unknown working day '{}'", day));
            }
        }

        let start = parse_clock(&self.start_time)?;
        let end = parse_clock(&self.end_time)?;
        if start >= end {
            return Err(format!(
                "start_time {} must be before end_time {}",
                self.start_time, self.end_time
            ));
        }
        Ok(())
    }

    /// Fill in days missing from a partial submission with the defaults
    pub fn normalized(mut self) -> Self {
        for (day, enabled) in default_working_days() {
            self.working_days.entry(day).or_insert(enabled);
        }
        self
    }
}

fn parse_clock(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| format!("'{}' is not a valid HH:MM time", value))
}
