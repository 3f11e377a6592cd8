//! Thread-safe alarm store.
//!
//! All mutation happens under a single mutex; persistence runs on a cloned
//! snapshot after the lock is released, so a slow or failing disk never
//! stalls the evaluation loop. Persistence failures are logged and the
//! in-memory state stays authoritative.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use super::model::{Alarm, AlarmId, Recurrence};
use super::recurrence::{classify, Disposition};
use crate::error::{CoreError, Result};

/// Where alarms live between runs.
pub trait AlarmPersistence: Send + Sync {
    fn load(&self) -> Result<Vec<Alarm>>;
    fn save(&self, alarms: &[Alarm]) -> Result<()>;
}

/// What one evaluation pass found due.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Alarms whose trigger minute matched this instant. Dedup markers are
    /// already stamped.
    pub fired: Vec<Alarm>,
    /// Alarms whose snooze deadline passed this instant. Snooze state is
    /// already cleared. An alarm can appear in both lists when its cleared
    /// snooze lands exactly on its trigger minute.
    pub unsnoozed: Vec<Alarm>,
}

impl SweepOutcome {
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty() && self.unsnoozed.is_empty()
    }
}

pub struct AlarmStore {
    alarms: Mutex<Vec<Alarm>>,
    persistence: Box<dyn AlarmPersistence>,
}

impl AlarmStore {
    /// Load persisted alarms and wrap them in a store.
    pub fn open(persistence: Box<dyn AlarmPersistence>) -> Result<Self> {
        let alarms = persistence.load()?;
        debug!(count = alarms.len(), "loaded alarms");
        Ok(Self {
            alarms: Mutex::new(alarms),
            persistence,
        })
    }

    fn locked(&self) -> MutexGuard<'_, Vec<Alarm>> {
        // A panic while holding the lock leaves plain data behind; keep
        // serving it rather than propagating the poison.
        self.alarms.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a new alarm. Any stale runtime markers on the value are cleared.
    pub fn add(&self, mut alarm: Alarm) -> AlarmId {
        alarm.snooze_until = None;
        alarm.last_triggered_day = None;
        let id = alarm.id;
        let snapshot = {
            let mut alarms = self.locked();
            alarms.push(alarm);
            alarms.clone()
        };
        self.save_snapshot(&snapshot);
        id
    }

    /// Replace an alarm's definition, keyed by `updated.id`.
    ///
    /// Runtime markers survive a cosmetic edit (label, sound, enabled) but
    /// are reset when the trigger time or recurrence changes.
    pub fn update(&self, updated: Alarm) -> Result<()> {
        let snapshot = {
            let mut alarms = self.locked();
            let slot = alarms
                .iter_mut()
                .find(|a| a.id == updated.id)
                .ok_or(CoreError::AlarmNotFound(updated.id))?;
            let keep_markers = !slot.schedule_differs(&updated);
            let (snooze_until, last_triggered_day) = if keep_markers {
                (slot.snooze_until, slot.last_triggered_day)
            } else {
                (None, None)
            };
            *slot = updated;
            slot.snooze_until = snooze_until;
            slot.last_triggered_day = last_triggered_day;
            alarms.clone()
        };
        self.save_snapshot(&snapshot);
        Ok(())
    }

    pub fn remove(&self, id: AlarmId) -> Result<Alarm> {
        let (removed, snapshot) = {
            let mut alarms = self.locked();
            let index = alarms
                .iter()
                .position(|a| a.id == id)
                .ok_or(CoreError::AlarmNotFound(id))?;
            let removed = alarms.remove(index);
            (removed, alarms.clone())
        };
        self.save_snapshot(&snapshot);
        Ok(removed)
    }

    /// Enable or disable an alarm. Disabling also clears any active snooze.
    pub fn set_enabled(&self, id: AlarmId, enabled: bool) -> Result<()> {
        let snapshot = {
            let mut alarms = self.locked();
            let alarm = alarms
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or(CoreError::AlarmNotFound(id))?;
            alarm.enabled = enabled;
            if !enabled {
                alarm.snooze_until = None;
            }
            alarms.clone()
        };
        self.save_snapshot(&snapshot);
        Ok(())
    }

    pub fn get(&self, id: AlarmId) -> Option<Alarm> {
        self.locked().iter().find(|a| a.id == id).cloned()
    }

    pub fn list(&self) -> Vec<Alarm> {
        self.locked().clone()
    }

    /// Arm a snooze deadline. Single-shot schedules get their same-day
    /// dedup marker cleared so the snoozed occurrence can ring again.
    pub fn snooze(&self, id: AlarmId, until: NaiveDateTime) -> Result<()> {
        let snapshot = {
            let mut alarms = self.locked();
            let alarm = alarms
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or(CoreError::AlarmNotFound(id))?;
            alarm.snooze_until = Some(until);
            if matches!(
                alarm.recurrence,
                Recurrence::Once | Recurrence::SpecificDate { .. }
            ) {
                alarm.last_triggered_day = None;
            }
            alarms.clone()
        };
        self.save_snapshot(&snapshot);
        Ok(())
    }

    pub fn clear_snooze(&self, id: AlarmId) -> Result<()> {
        let snapshot = {
            let mut alarms = self.locked();
            let alarm = alarms
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or(CoreError::AlarmNotFound(id))?;
            alarm.snooze_until = None;
            alarms.clone()
        };
        self.save_snapshot(&snapshot);
        Ok(())
    }

    /// One evaluation pass over every alarm. Alarms already ringing are
    /// skipped entirely, so a session stays open across later minutes.
    ///
    /// Classification and marker updates happen atomically under the lock;
    /// an alarm whose snooze expires exactly on its trigger minute is both
    /// un-snoozed and fired in the same pass.
    pub fn sweep(&self, now: NaiveDateTime, already_ringing: &HashSet<AlarmId>) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        let snapshot = {
            let mut alarms = self.locked();
            for alarm in alarms.iter_mut() {
                if already_ringing.contains(&alarm.id) {
                    continue;
                }
                match classify(alarm, now) {
                    Disposition::Skip => {}
                    Disposition::Fire => {
                        alarm.last_triggered_day = Some(now.date());
                        outcome.fired.push(alarm.clone());
                    }
                    Disposition::Unsnooze => {
                        alarm.snooze_until = None;
                        if classify(alarm, now) == Disposition::Fire {
                            alarm.last_triggered_day = Some(now.date());
                            outcome.fired.push(alarm.clone());
                        }
                        outcome.unsnoozed.push(alarm.clone());
                    }
                }
            }
            if outcome.is_empty() {
                return outcome;
            }
            alarms.clone()
        };
        self.save_snapshot(&snapshot);
        outcome
    }

    /// Force a write of the current state, e.g. during shutdown.
    pub fn persist(&self) {
        let snapshot = self.locked().clone();
        self.save_snapshot(&snapshot);
    }

    fn save_snapshot(&self, snapshot: &[Alarm]) {
        if let Err(e) = self.persistence.save(snapshot) {
            warn!("failed to persist alarms: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveTime};

    use super::*;

    /// In-memory persistence that counts saves and can be told to fail.
    struct FakePersistence {
        initial: Vec<Alarm>,
        saves: Arc<AtomicUsize>,
        fail_saves: bool,
    }

    impl FakePersistence {
        fn empty() -> Self {
            Self::with(Vec::new())
        }

        fn with(initial: Vec<Alarm>) -> Self {
            Self {
                initial,
                saves: Arc::new(AtomicUsize::new(0)),
                fail_saves: false,
            }
        }
    }

    impl AlarmPersistence for FakePersistence {
        fn load(&self) -> Result<Vec<Alarm>> {
            Ok(self.initial.clone())
        }

        fn save(&self, _alarms: &[Alarm]) -> Result<()> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_saves {
                return Err(CoreError::Io(std::io::Error::other("disk full")));
            }
            Ok(())
        }
    }

    fn store() -> AlarmStore {
        AlarmStore::open(Box::new(FakePersistence::empty())).unwrap()
    }

    fn daily(hour: u8, minute: u8) -> Alarm {
        Alarm::new(hour, minute, "test", "chime", Recurrence::Daily).unwrap()
    }

    fn at(hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(hour, minute, second).unwrap())
    }

    #[test]
    fn open_loads_persisted_alarms() {
        let seeded = vec![daily(6, 0), daily(7, 0)];
        let store = AlarmStore::open(Box::new(FakePersistence::with(seeded))).unwrap();
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn add_clears_stale_markers() {
        let store = store();
        let mut alarm = daily(7, 30);
        alarm.snooze_until = Some(at(7, 39, 0));
        alarm.last_triggered_day = Some(at(7, 30, 0).date());
        let id = store.add(alarm);
        let stored = store.get(id).unwrap();
        assert!(stored.snooze_until.is_none());
        assert!(stored.last_triggered_day.is_none());
    }

    #[test]
    fn cosmetic_edit_keeps_markers() {
        let store = store();
        let id = store.add(daily(7, 30));
        store.snooze(id, at(7, 39, 0)).unwrap();

        let mut edited = store.get(id).unwrap();
        edited.label = "new label".to_string();
        store.update(edited).unwrap();

        assert_eq!(store.get(id).unwrap().snooze_until, Some(at(7, 39, 0)));
    }

    #[test]
    fn schedule_edit_resets_markers() {
        let store = store();
        let id = store.add(daily(7, 30));
        store.snooze(id, at(7, 39, 0)).unwrap();
        store
            .sweep(at(7, 39, 0), &HashSet::new());

        let mut edited = store.get(id).unwrap();
        edited.minute = 45;
        store.update(edited).unwrap();

        let stored = store.get(id).unwrap();
        assert!(stored.snooze_until.is_none());
        assert!(stored.last_triggered_day.is_none());
        assert_eq!(stored.minute, 45);
    }

    #[test]
    fn update_unknown_id_fails() {
        let store = store();
        let ghost = daily(7, 30);
        assert!(matches!(
            store.update(ghost),
            Err(CoreError::AlarmNotFound(_))
        ));
    }

    #[test]
    fn disable_clears_snooze() {
        let store = store();
        let id = store.add(daily(7, 30));
        store.snooze(id, at(7, 39, 0)).unwrap();
        store.set_enabled(id, false).unwrap();
        let stored = store.get(id).unwrap();
        assert!(!stored.enabled);
        assert!(stored.snooze_until.is_none());
    }

    #[test]
    fn snooze_clears_marker_for_single_shot_only() {
        let store = store();
        let once_id = store.add(
            Alarm::new(7, 30, "", "chime", Recurrence::Once).unwrap(),
        );
        let daily_id = store.add(daily(7, 30));
        store.sweep(at(7, 30, 0), &HashSet::new());
        assert!(store.get(once_id).unwrap().last_triggered_day.is_some());
        assert!(store.get(daily_id).unwrap().last_triggered_day.is_some());

        store.snooze(once_id, at(7, 39, 0)).unwrap();
        store.snooze(daily_id, at(7, 39, 0)).unwrap();
        assert!(store.get(once_id).unwrap().last_triggered_day.is_none());
        assert!(store.get(daily_id).unwrap().last_triggered_day.is_some());
    }

    #[test]
    fn sweep_fires_and_stamps_at_the_trigger_instant() {
        let store = store();
        let id = store.add(daily(7, 30));

        let outcome = store.sweep(at(7, 29, 59), &HashSet::new());
        assert!(outcome.is_empty());

        let outcome = store.sweep(at(7, 30, 0), &HashSet::new());
        assert_eq!(outcome.fired.len(), 1);
        assert_eq!(outcome.fired[0].id, id);
        assert_eq!(
            store.get(id).unwrap().last_triggered_day,
            Some(at(7, 30, 0).date())
        );
    }

    #[test]
    fn sweep_skips_alarms_already_ringing() {
        let store = store();
        let id = store.add(daily(7, 30));
        let ringing: HashSet<AlarmId> = [id].into_iter().collect();
        let outcome = store.sweep(at(7, 30, 0), &ringing);
        assert!(outcome.is_empty());
        assert!(store.get(id).unwrap().last_triggered_day.is_none());
    }

    #[test]
    fn sweep_unsnoozes_past_deadlines() {
        let store = store();
        let id = store.add(daily(7, 30));
        store.snooze(id, at(7, 39, 0)).unwrap();

        let outcome = store.sweep(at(7, 38, 59), &HashSet::new());
        assert!(outcome.is_empty());

        let outcome = store.sweep(at(7, 39, 23), &HashSet::new());
        assert_eq!(outcome.unsnoozed.len(), 1);
        assert!(outcome.fired.is_empty());
        assert!(store.get(id).unwrap().snooze_until.is_none());
    }

    #[test]
    fn snooze_expiring_on_trigger_minute_unsnoozes_and_fires() {
        let store = store();
        let id = store.add(daily(7, 30));
        store.snooze(id, at(7, 30, 0)).unwrap();

        let outcome = store.sweep(at(7, 30, 0), &HashSet::new());
        assert_eq!(outcome.unsnoozed.len(), 1);
        assert_eq!(outcome.fired.len(), 1);
        assert_eq!(outcome.fired[0].id, id);
    }

    #[test]
    fn every_mutation_writes_a_snapshot() {
        let persistence = FakePersistence::empty();
        let saves = Arc::clone(&persistence.saves);
        let store = AlarmStore::open(Box::new(persistence)).unwrap();
        let id = store.add(daily(7, 30));
        store.snooze(id, at(7, 39, 0)).unwrap();
        store.remove(id).unwrap();
        assert_eq!(saves.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failed_save_keeps_memory_state() {
        let persistence = FakePersistence {
            fail_saves: true,
            ..FakePersistence::empty()
        };
        let store = AlarmStore::open(Box::new(persistence)).unwrap();
        let id = store.add(daily(7, 30));
        assert!(store.get(id).is_some());
    }
}
