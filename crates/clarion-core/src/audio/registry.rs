//! Ringing session registry.
//!
//! At most one session exists per alarm id; `start` is idempotent and
//! returns the existing channel on a repeat call. Session bookkeeping and
//! fade-step volume writes share one mutex so that stop-versus-fade races
//! resolve cleanly: once a session is removed, in-flight fade steps see it
//! gone and end.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Local, NaiveDateTime};
use tokio::task::JoinHandle;
use tracing::debug;

use super::fade::{self, FadeSettings};
use super::{AudioBackend, ChannelId};
use crate::alarm::{Alarm, AlarmId};
use crate::error::AudioError;

/// One live ringing session.
pub struct RingingSession {
    pub alarm_id: AlarmId,
    pub channel: ChannelId,
    pub started_at: NaiveDateTime,
    /// Fade-in task; aborted when the session stops before the ramp ends.
    fade: Option<JoinHandle<()>>,
}

pub struct RingingRegistry {
    sessions: Mutex<HashMap<AlarmId, RingingSession>>,
    audio: Arc<dyn AudioBackend>,
}

impl RingingRegistry {
    pub fn new(audio: Arc<dyn AudioBackend>) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            audio,
        })
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<AlarmId, RingingSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Open a ringing session for `alarm`, starting looped playback at
    /// silence and ramping to `target_volume`. Returns the already-open
    /// channel if the alarm is ringing.
    pub fn start(
        self: &Arc<Self>,
        alarm: &Alarm,
        target_volume: f32,
        settings: FadeSettings,
    ) -> Result<ChannelId, AudioError> {
        let sound = self.audio.resolve(&alarm.sound)?;
        let channel = {
            let mut sessions = self.locked();
            if let Some(existing) = sessions.get(&alarm.id) {
                return Ok(existing.channel);
            }
            let channel = self.audio.play_looped(&sound)?;
            sessions.insert(
                alarm.id,
                RingingSession {
                    alarm_id: alarm.id,
                    channel,
                    started_at: Local::now().naive_local(),
                    fade: None,
                },
            );
            channel
        };
        debug!(alarm_id = %alarm.id, %channel, "ringing session opened");

        let ramp = fade::spawn_ramp(
            Arc::clone(self),
            alarm.id,
            channel,
            target_volume,
            settings,
        );
        let mut sessions = self.locked();
        match sessions.get_mut(&alarm.id) {
            Some(session) if session.channel == channel => session.fade = Some(ramp),
            // Stopped between insert and here; the channel is already dead.
            _ => ramp.abort(),
        }
        Ok(channel)
    }

    /// Close the session for `id`, cancelling its fade and silencing the
    /// channel. Returns false when nothing was ringing.
    pub fn stop(&self, id: AlarmId) -> bool {
        let removed = self.locked().remove(&id);
        match removed {
            Some(session) => {
                if let Some(ramp) = session.fade {
                    ramp.abort();
                }
                self.audio.stop(session.channel);
                debug!(alarm_id = %id, channel = %session.channel, "ringing session closed");
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let ids: Vec<AlarmId> = self.locked().keys().copied().collect();
        for id in ids {
            self.stop(id);
        }
    }

    pub fn is_ringing(&self, id: AlarmId) -> bool {
        self.locked().contains_key(&id)
    }

    pub fn ringing_ids(&self) -> HashSet<AlarmId> {
        self.locked().keys().copied().collect()
    }

    pub fn active_count(&self) -> usize {
        self.locked().len()
    }

    /// One fade step: apply `volume` if the session is still live on this
    /// channel. Returns false to tell the ramp to end.
    pub(super) fn advance_fade(&self, id: AlarmId, channel: ChannelId, volume: f32) -> bool {
        let sessions = self.locked();
        match sessions.get(&id) {
            Some(session) if session.channel == channel && self.audio.is_busy(channel) => {
                self.audio.set_volume(channel, volume);
                true
            }
            _ => false,
        }
    }
}
