use std::collections::BTreeSet;

use chrono::{Local, NaiveDate, TimeDelta};
use clap::Subcommand;
use clarion_core::alarm::recurrence::upcoming_occurrences;
use clarion_core::{Alarm, AlarmId, AlarmStore, AlarmsFile, Config, Recurrence};

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Add a new alarm
    Add {
        /// Trigger time, e.g. "7:30" or "07:30"
        time: String,
        /// Alarm label
        #[arg(long, default_value = "")]
        label: String,
        /// Sound name or file path
        #[arg(long)]
        sound: String,
        /// Repeat spec: once, daily, weekdays, weekends,
        /// a comma list of weekdays (mon,wed,fri) or a date (2025-12-24)
        #[arg(long, default_value = "once")]
        repeat: String,
    },
    /// List alarms
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Enable an alarm
    Enable { id: AlarmId },
    /// Disable an alarm
    Disable { id: AlarmId },
    /// Remove an alarm
    Remove { id: AlarmId },
    /// Snooze an alarm
    Snooze {
        id: AlarmId,
        /// Minutes to snooze (defaults to the configured duration)
        #[arg(long)]
        minutes: Option<i64>,
    },
    /// Dismiss an alarm, clearing any pending snooze
    Stop { id: AlarmId },
    /// Show the days an alarm will ring in the coming week
    Next {
        id: AlarmId,
        /// How many days ahead to look
        #[arg(long, default_value = "7")]
        days: u32,
    },
}

fn open_store() -> Result<AlarmStore, Box<dyn std::error::Error>> {
    Ok(AlarmStore::open(Box::new(AlarmsFile::open()?))?)
}

fn parse_time(spec: &str) -> Result<(u8, u8), Box<dyn std::error::Error>> {
    let (hour, minute) = spec
        .split_once(':')
        .ok_or_else(|| format!("invalid time '{spec}', expected HH:MM"))?;
    let hour: u8 = hour.parse().map_err(|_| format!("invalid hour '{hour}'"))?;
    let minute: u8 = minute
        .parse()
        .map_err(|_| format!("invalid minute '{minute}'"))?;
    Ok((hour, minute))
}

fn parse_repeat(spec: &str) -> Result<Recurrence, Box<dyn std::error::Error>> {
    match spec {
        "once" => Ok(Recurrence::Once),
        "daily" => Ok(Recurrence::Daily),
        "weekdays" => Ok(Recurrence::Weekdays),
        "weekends" => Ok(Recurrence::Weekends),
        other => {
            if let Ok(date) = NaiveDate::parse_from_str(other, "%Y-%m-%d") {
                return Ok(Recurrence::SpecificDate { date });
            }
            let mut days = BTreeSet::new();
            for part in other.split(',') {
                let index = match part.trim().to_ascii_lowercase().as_str() {
                    "mon" => 0,
                    "tue" => 1,
                    "wed" => 2,
                    "thu" => 3,
                    "fri" => 4,
                    "sat" => 5,
                    "sun" => 6,
                    unknown => return Err(format!("unknown weekday '{unknown}'").into()),
                };
                days.insert(index);
            }
            Ok(Recurrence::SpecificDays { days })
        }
    }
}

fn print_alarm(alarm: &Alarm) {
    let mut flags = Vec::new();
    if !alarm.enabled {
        flags.push("disabled".to_string());
    }
    if let Some(until) = alarm.snooze_until {
        flags.push(format!("snoozed until {}", until.format("%H:%M")));
    }
    let flags = if flags.is_empty() {
        String::new()
    } else {
        format!("  [{}]", flags.join(", "))
    };
    println!(
        "{}  {}  {}  {}{}",
        alarm.id,
        alarm.time_display(),
        alarm.recurrence.describe(),
        alarm.label,
        flags
    );
}

pub fn run(action: AlarmAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AlarmAction::Add { time, label, sound, repeat } => {
            let (hour, minute) = parse_time(&time)?;
            let recurrence = parse_repeat(&repeat)?;
            let alarm = Alarm::new(hour, minute, label, sound, recurrence)?;
            let store = open_store()?;
            let id = store.add(alarm);
            println!("added {id}");
        }
        AlarmAction::List { json } => {
            let store = open_store()?;
            let alarms = store.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&alarms)?);
            } else if alarms.is_empty() {
                println!("no alarms");
            } else {
                for alarm in &alarms {
                    print_alarm(alarm);
                }
            }
        }
        AlarmAction::Enable { id } => {
            open_store()?.set_enabled(id, true)?;
            println!("enabled {id}");
        }
        AlarmAction::Disable { id } => {
            open_store()?.set_enabled(id, false)?;
            println!("disabled {id}");
        }
        AlarmAction::Remove { id } => {
            let removed = open_store()?.remove(id)?;
            println!("removed {} ({})", removed.id, removed.time_display());
        }
        AlarmAction::Snooze { id, minutes } => {
            let config = Config::load_or_default();
            let minutes = minutes.unwrap_or_else(|| i64::from(config.snooze_minutes.max(1)));
            if minutes < 1 {
                return Err("snooze must be at least one minute".into());
            }
            let until = Local::now().naive_local() + TimeDelta::minutes(minutes);
            open_store()?.snooze(id, until)?;
            println!("snoozed until {}", until.format("%H:%M"));
        }
        AlarmAction::Stop { id } => {
            open_store()?.clear_snooze(id)?;
            println!("stopped {id}");
        }
        AlarmAction::Next { id, days } => {
            let store = open_store()?;
            let alarm = store
                .get(id)
                .ok_or_else(|| format!("no such alarm: {id}"))?;
            let dates = upcoming_occurrences(&alarm, Local::now().date_naive(), days);
            if dates.is_empty() {
                println!("no upcoming rings in the next {days} days");
            } else {
                for date in dates {
                    println!("{} {}", date.format("%Y-%m-%d %a"), alarm.time_display());
                }
            }
        }
    }
    Ok(())
}
