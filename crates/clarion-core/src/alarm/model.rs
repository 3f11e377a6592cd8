//! Alarm data model.
//!
//! Persisted records are deserialized leniently: every field carries a
//! serde default so that a partially written or hand-edited record still
//! loads instead of poisoning the whole alarm file.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Stable identity of an alarm across edits, snoozes and restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(Uuid);

impl AlarmId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AlarmId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AlarmId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// When an alarm repeats. Weekday indices run Monday = 0 .. Sunday = 6.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    /// Ring a single time, then stay armed but inert until re-edited.
    #[default]
    Once,
    Daily,
    Weekdays,
    Weekends,
    /// Ring on an explicit set of weekdays. An empty set never matches.
    SpecificDays { days: BTreeSet<u8> },
    /// Ring on one calendar date only.
    SpecificDate { date: NaiveDate },
}

impl Recurrence {
    /// Human-readable schedule summary for list output.
    pub fn describe(&self) -> String {
        const NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
        match self {
            Recurrence::Once => "once".to_string(),
            Recurrence::Daily => "daily".to_string(),
            Recurrence::Weekdays => "weekdays".to_string(),
            Recurrence::Weekends => "weekends".to_string(),
            Recurrence::SpecificDays { days } => {
                let names: Vec<&str> = days
                    .iter()
                    .filter_map(|d| NAMES.get(usize::from(*d)).copied())
                    .collect();
                if names.is_empty() {
                    "never".to_string()
                } else {
                    names.join(",")
                }
            }
            Recurrence::SpecificDate { date } => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// A single alarm with its schedule and transient trigger state.
///
/// `snooze_until` and `last_triggered_day` are runtime markers that happen
/// to be persisted so a restart mid-snooze behaves sanely. They are reset
/// whenever the schedule itself is edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    #[serde(default = "AlarmId::new")]
    pub id: AlarmId,
    #[serde(default)]
    pub hour: u8,
    #[serde(default)]
    pub minute: u8,
    #[serde(default)]
    pub label: String,
    /// Reference to the ringtone, resolved by the audio backend. Either a
    /// bare sound name or a filesystem path.
    #[serde(default)]
    pub sound: String,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub snooze_until: Option<NaiveDateTime>,
    /// Last calendar day this alarm rang. Consulted only for `Once` and
    /// `SpecificDate` so they fire at most once per day.
    #[serde(default)]
    pub last_triggered_day: Option<NaiveDate>,
}

fn default_true() -> bool {
    true
}

impl Alarm {
    /// Build a new enabled alarm, validating the trigger time and sound.
    pub fn new(
        hour: u8,
        minute: u8,
        label: impl Into<String>,
        sound: impl Into<String>,
        recurrence: Recurrence,
    ) -> Result<Self, ValidationError> {
        let sound = sound.into();
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidTime { hour, minute });
        }
        if sound.is_empty() {
            return Err(ValidationError::MissingSound);
        }
        Ok(Self {
            id: AlarmId::new(),
            hour,
            minute,
            label: label.into(),
            sound,
            recurrence,
            enabled: true,
            snooze_until: None,
            last_triggered_day: None,
        })
    }

    /// "HH:MM" trigger time, for logs and list output.
    pub fn time_display(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    pub fn is_snoozed(&self, now: NaiveDateTime) -> bool {
        self.snooze_until.is_some_and(|until| now < until)
    }

    /// True when `other` changes the trigger time or recurrence, i.e. the
    /// edit invalidates any snooze or same-day dedup state.
    pub fn schedule_differs(&self, other: &Alarm) -> bool {
        self.hour != other.hour
            || self.minute != other.minute
            || self.recurrence != other.recurrence
    }
}
