//! Volume fade-in for freshly opened ringing sessions.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use super::registry::RingingRegistry;
use super::ChannelId;
use crate::alarm::AlarmId;

/// Shape of the fade-in ramp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FadeSettings {
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_steps")]
    pub steps: u32,
}

fn default_duration_ms() -> u64 {
    5000
}

fn default_steps() -> u32 {
    20
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            steps: default_steps(),
        }
    }
}

impl FadeSettings {
    fn step_gap(&self) -> Duration {
        let steps = u64::from(self.steps.max(1));
        Duration::from_millis((self.duration_ms / steps).max(1))
    }
}

/// Ramp `channel` from silence to `target` in `settings.steps` increments.
///
/// Each step re-checks, under the registry lock, that the session still
/// exists with this channel and that the channel is still audible; if
/// either no longer holds the ramp ends without touching the volume. The
/// returned handle is aborted when the session is stopped early.
pub(crate) fn spawn_ramp(
    registry: Arc<RingingRegistry>,
    alarm_id: AlarmId,
    channel: ChannelId,
    target: f32,
    settings: FadeSettings,
) -> JoinHandle<()> {
    let steps = settings.steps.max(1);
    let gap = settings.step_gap();
    tokio::spawn(async move {
        for step in 1..=steps {
            tokio::time::sleep(gap).await;
            let volume = (target * step as f32 / steps as f32).min(target);
            if !registry.advance_fade(alarm_id, channel, volume) {
                return;
            }
        }
    })
}
