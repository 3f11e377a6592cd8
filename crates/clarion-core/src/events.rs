use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::alarm::AlarmId;

/// Every observable state change in the engine produces an Event.
/// Display layers subscribe to the engine's broadcast channel and treat
/// these as refresh hints; nothing feeds back into core logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// An alarm matched its trigger minute and a ringing session was opened
    /// (or attempted -- see `SessionStartFailed`).
    AlarmFired {
        alarm_id: AlarmId,
        label: String,
        at: DateTime<Local>,
    },
    /// An expired snooze was cleared and the alarm resumed ringing.
    AlarmUnsnoozed {
        alarm_id: AlarmId,
        at: DateTime<Local>,
    },
    AlarmSnoozed {
        alarm_id: AlarmId,
        until: DateTime<Local>,
        at: DateTime<Local>,
    },
    AlarmStopped {
        alarm_id: AlarmId,
        at: DateTime<Local>,
    },
    /// Sound could not be started for a due alarm. The occurrence still
    /// counts as triggered and the notification was still delivered.
    SessionStartFailed {
        alarm_id: AlarmId,
        reason: String,
        at: DateTime<Local>,
    },
}
