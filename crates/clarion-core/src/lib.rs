//! # Clarion Core Library
//!
//! The engine behind the Clarion alarm clock: alarm definitions and
//! recurrence rules, the sub-second evaluation loop, ringing sessions
//! with fade-in, snooze handling, and JSON/TOML persistence.
//!
//! ## Architecture
//!
//! - [`alarm`] -- alarm model, recurrence evaluation, thread-safe store
//! - [`audio`] -- playback backend trait, ringing registry, fade ramps
//! - [`engine`] -- evaluation loop and user-facing operations
//! - [`notify`] -- notification delivery boundary
//! - [`storage`] -- alarms file and TOML configuration
//!
//! The engine owns no UI. Display layers subscribe to its event channel
//! and render; external effects (sound, notifications, persistence) sit
//! behind traits so embedders can swap them out.

pub mod alarm;
pub mod audio;
pub mod engine;
pub mod error;
pub mod events;
pub mod notify;
pub mod storage;

pub use alarm::{Alarm, AlarmId, AlarmPersistence, AlarmStore, Recurrence};
pub use audio::{AudioBackend, ChannelId, FadeSettings, RingingRegistry, RodioBackend, SoundHandle};
pub use engine::{Engine, EngineSettings};
pub use error::{AudioError, ConfigError, CoreError, Result, ValidationError};
pub use events::Event;
pub use notify::{LogNotifier, Notifier};
pub use storage::{data_dir, AlarmsFile, Config};
