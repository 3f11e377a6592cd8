//! Core error types for clarion-core.
//!
//! A thiserror hierarchy shared across the library. Collaborator failures
//! that the engine treats as non-fatal (persistence writes, notification
//! delivery) are logged at the call site rather than propagated.

use std::path::PathBuf;
use thiserror::Error;

use crate::alarm::AlarmId;

/// Core error type for clarion-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Audio backend errors
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No alarm with the given id exists in the store
    #[error("No such alarm: {0}")]
    AlarmNotFound(AlarmId),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// The data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),

    /// `config set` with a dot-path that does not exist
    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    /// `config set` with a value the field's type cannot hold
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Audio-backend errors. A failed session start is reported to the caller
/// so it can still deliver the notification for the occurrence.
#[derive(Error, Debug)]
pub enum AudioError {
    /// The sound reference could not be resolved to a playable source
    #[error("Sound not found: {0}")]
    SoundNotFound(String),

    /// The backend has no free playback channel
    #[error("No playback channel available")]
    NoChannel,

    /// The backend failed to decode or play the source
    #[error("Playback failed: {0}")]
    Playback(String),

    /// The audio thread is gone
    #[error("Audio backend unavailable: {0}")]
    Unavailable(String),
}

/// Validation errors raised at alarm construction/load time.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Hour or minute outside the wall-clock range
    #[error("Invalid trigger time {hour:02}:{minute:02}")]
    InvalidTime { hour: u8, minute: u8 },

    /// An enabled alarm needs a resolvable sound reference
    #[error("Enabled alarm has no sound reference")]
    MissingSound,

    /// Snooze durations below one minute are rejected
    #[error("Snooze duration must be at least one minute (got {0})")]
    SnoozeTooShort(i64),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
