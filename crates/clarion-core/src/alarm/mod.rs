mod model;
pub mod recurrence;
mod store;

pub use model::{Alarm, AlarmId, Recurrence};
pub use store::{AlarmPersistence, AlarmStore, SweepOutcome};
