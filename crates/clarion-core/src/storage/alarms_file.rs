//! JSON persistence for alarms.
//!
//! Loading is lenient per record: a malformed entry is logged and skipped
//! so one bad record never blocks the rest. A file that is not valid JSON
//! at the top level is treated as absent; the next save rewrites it whole.

use std::fs;
use std::path::PathBuf;

use tracing::warn;

use super::data_dir;
use crate::alarm::{Alarm, AlarmPersistence};
use crate::error::Result;

pub struct AlarmsFile {
    path: PathBuf,
}

impl AlarmsFile {
    /// Alarms file in the standard data directory.
    pub fn open() -> Result<Self> {
        Ok(Self {
            path: data_dir()?.join("alarms.json"),
        })
    }

    /// Alarms file at an explicit path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl AlarmPersistence for AlarmsFile {
    fn load(&self) -> Result<Vec<Alarm>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<serde_json::Value> = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %self.path.display(), "alarms file unreadable, starting empty: {e}");
                return Ok(Vec::new());
            }
        };
        let mut alarms = Vec::with_capacity(records.len());
        for record in records {
            match serde_json::from_value::<Alarm>(record) {
                Ok(alarm) => alarms.push(alarm),
                Err(e) => warn!("skipping malformed alarm record: {e}"),
            }
        }
        Ok(alarms)
    }

    fn save(&self, alarms: &[Alarm]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(alarms)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::Recurrence;

    fn file_in(dir: &tempfile::TempDir) -> AlarmsFile {
        AlarmsFile::with_path(dir.path().join("alarms.json"))
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(file_in(&dir).load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = file_in(&dir);
        let alarms = vec![
            Alarm::new(7, 30, "wake", "chime", Recurrence::Weekdays).unwrap(),
            Alarm::new(9, 0, "brunch", "bells", Recurrence::Weekends).unwrap(),
        ];
        file.save(&alarms).unwrap();
        assert_eq!(file.load().unwrap(), alarms);
    }

    #[test]
    fn malformed_records_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let file = file_in(&dir);
        let content = r#"[
            {"hour": 7, "minute": 30, "label": "ok"},
            {"hour": "not a number"},
            {"minute": 15}
        ]"#;
        fs::write(dir.path().join("alarms.json"), content).unwrap();
        let alarms = file.load().unwrap();
        assert_eq!(alarms.len(), 2);
        assert_eq!(alarms[0].label, "ok");
        assert_eq!(alarms[1].minute, 15);
    }

    #[test]
    fn unreadable_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = file_in(&dir);
        fs::write(dir.path().join("alarms.json"), "not json at all").unwrap();
        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = AlarmsFile::with_path(dir.path().join("nested/deeper/alarms.json"));
        file.save(&[]).unwrap();
        assert!(file.load().unwrap().is_empty());
    }
}
