//! Alarm engine.
//!
//! Ties the store, ringing registry and notifier together behind one
//! handle. A tokio ticker drives the evaluation loop at a sub-second
//! cadence; every observable state change is broadcast as an [`Event`]
//! for display layers to consume.
//!
//! Lock discipline: the store and registry each have their own mutex and
//! no engine path holds both at once. Each tick snapshots the ringing set
//! first, then sweeps the store.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::alarm::{Alarm, AlarmId, AlarmStore};
use crate::audio::{AudioBackend, FadeSettings, RingingRegistry};
use crate::error::{Result, ValidationError};
use crate::events::Event;
use crate::notify::Notifier;
use crate::storage::Config;

/// Runtime knobs, usually derived from [`Config`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub tick_interval: Duration,
    /// Target ringing volume after the fade-in completes.
    pub volume: f32,
    /// Default snooze duration in minutes.
    pub snooze_minutes: i64,
    pub fade: FadeSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.tick_interval_ms.clamp(50, 1000)),
            volume: config.volume.clamp(0.0, 1.0),
            snooze_minutes: i64::from(config.snooze_minutes.max(1)),
            fade: config.fade,
        }
    }
}

pub struct Engine {
    store: Arc<AlarmStore>,
    registry: Arc<RingingRegistry>,
    notifier: Arc<dyn Notifier>,
    settings: EngineSettings,
    events: broadcast::Sender<Event>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    pub fn new(
        store: Arc<AlarmStore>,
        audio: Arc<dyn AudioBackend>,
        notifier: Arc<dyn Notifier>,
        settings: EngineSettings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            store,
            registry: RingingRegistry::new(audio),
            notifier,
            settings,
            events,
            ticker: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &AlarmStore {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn is_ringing(&self, id: AlarmId) -> bool {
        self.registry.is_ringing(id)
    }

    pub fn ringing_count(&self) -> usize {
        self.registry.active_count()
    }

    /// Start the evaluation loop. Idempotent; a second call is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut ticker = self.ticker.lock().unwrap_or_else(|e| e.into_inner());
        if ticker.is_some() {
            return;
        }
        let engine = Arc::clone(self);
        let interval = self.settings.tick_interval;
        *ticker = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                engine.run_tick(Local::now().naive_local());
            }
        }));
        info!(interval_ms = interval.as_millis() as u64, "evaluation loop started");
    }

    /// One evaluation pass at `now`. Public so tests and embedders can
    /// drive the clock themselves.
    pub fn run_tick(&self, now: NaiveDateTime) {
        let ringing = self.registry.ringing_ids();
        let outcome = self.store.sweep(now, &ringing);
        if outcome.is_empty() {
            return;
        }
        let at = Local::now();

        for alarm in &outcome.unsnoozed {
            self.emit(Event::AlarmUnsnoozed { alarm_id: alarm.id, at });
        }

        // An alarm can be in both lists when its snooze expired on its own
        // trigger minute; ring it once.
        let mut seen: HashSet<AlarmId> = HashSet::new();
        for alarm in outcome.fired.iter().chain(outcome.unsnoozed.iter()) {
            if !seen.insert(alarm.id) {
                continue;
            }
            self.ring(alarm, at);
        }

        for alarm in &outcome.fired {
            self.emit(Event::AlarmFired {
                alarm_id: alarm.id,
                label: alarm.label.clone(),
                at,
            });
        }
    }

    /// Open a ringing session and deliver the notification. A failed
    /// session start still notifies; the user gets something either way.
    fn ring(&self, alarm: &Alarm, at: chrono::DateTime<Local>) {
        match self
            .registry
            .start(alarm, self.settings.volume, self.settings.fade)
        {
            Ok(channel) => {
                info!(alarm_id = %alarm.id, %channel, label = %alarm.label, "alarm ringing");
            }
            Err(e) => {
                warn!(alarm_id = %alarm.id, "could not start ringing session: {e}");
                self.emit(Event::SessionStartFailed {
                    alarm_id: alarm.id,
                    reason: e.to_string(),
                    at,
                });
            }
        }
        let title = if alarm.label.is_empty() {
            format!("Alarm {}", alarm.time_display())
        } else {
            alarm.label.clone()
        };
        self.notifier
            .notify(&title, &format!("It is {}", alarm.time_display()));
    }

    pub fn add_alarm(&self, alarm: Alarm) -> AlarmId {
        self.store.add(alarm)
    }

    /// Replace an alarm's definition. An active ringing session for it is
    /// stopped first, so an edited alarm never keeps ringing on the old
    /// schedule.
    pub fn update_alarm(&self, updated: Alarm) -> Result<()> {
        if self.registry.stop(updated.id) {
            self.emit(Event::AlarmStopped {
                alarm_id: updated.id,
                at: Local::now(),
            });
        }
        self.store.update(updated)
    }

    pub fn delete_alarm(&self, id: AlarmId) -> Result<Alarm> {
        self.registry.stop(id);
        self.store.remove(id)
    }

    pub fn set_enabled(&self, id: AlarmId, enabled: bool) -> Result<()> {
        if !enabled && self.registry.stop(id) {
            self.emit(Event::AlarmStopped {
                alarm_id: id,
                at: Local::now(),
            });
        }
        self.store.set_enabled(id, enabled)
    }

    /// Snooze with the configured default duration.
    pub fn snooze(&self, id: AlarmId) -> Result<NaiveDateTime> {
        self.snooze_for(id, self.settings.snooze_minutes)
    }

    /// Snooze for an explicit number of minutes (at least one). Silences
    /// any active session and re-arms the alarm for `now + minutes`.
    pub fn snooze_for(&self, id: AlarmId, minutes: i64) -> Result<NaiveDateTime> {
        if minutes < 1 {
            return Err(ValidationError::SnoozeTooShort(minutes).into());
        }
        let now = Local::now();
        let until = now.naive_local() + TimeDelta::minutes(minutes);
        self.store.snooze(id, until)?;
        self.registry.stop(id);
        self.emit(Event::AlarmSnoozed {
            alarm_id: id,
            until: now + TimeDelta::minutes(minutes),
            at: now,
        });
        self.notifier.notify(
            "Alarm snoozed",
            &format!("Ringing again at {}", until.format("%H:%M")),
        );
        info!(alarm_id = %id, %until, "alarm snoozed");
        Ok(until)
    }

    /// Dismiss an alarm: silence its session and drop any pending snooze.
    pub fn stop(&self, id: AlarmId) -> Result<()> {
        self.store.clear_snooze(id)?;
        if self.registry.stop(id) {
            self.emit(Event::AlarmStopped {
                alarm_id: id,
                at: Local::now(),
            });
        }
        Ok(())
    }

    /// Ordered teardown: halt the loop so nothing new fires, silence every
    /// session, then write the final state.
    pub fn shutdown(&self) {
        if let Some(ticker) = self
            .ticker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            ticker.abort();
        }
        self.registry.stop_all();
        self.store.persist();
        info!("engine shut down");
    }

    fn emit(&self, event: Event) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }
}
