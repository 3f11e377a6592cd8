//! Audio playback abstraction and ringing session management.

mod fade;
mod registry;
mod rodio_backend;

pub use fade::FadeSettings;
pub use registry::{RingingRegistry, RingingSession};
pub use rodio_backend::RodioBackend;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::AudioError;

/// Opaque handle to one playback channel inside a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub(crate) u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// A sound reference resolved to a playable source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundHandle {
    path: PathBuf,
}

impl SoundHandle {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Playback backend boundary. The engine only ever talks to this trait;
/// the default implementation is [`RodioBackend`].
///
/// `set_volume`, `stop` and `is_busy` are best-effort on channels that no
/// longer exist.
pub trait AudioBackend: Send + Sync {
    /// Turn a user-supplied sound reference into a playable source.
    fn resolve(&self, reference: &str) -> Result<SoundHandle, AudioError>;

    /// Start looped playback at volume 0.0. The caller ramps the volume up.
    fn play_looped(&self, sound: &SoundHandle) -> Result<ChannelId, AudioError>;

    fn set_volume(&self, channel: ChannelId, volume: f32);

    fn stop(&self, channel: ChannelId);

    /// Whether the channel is still producing audio.
    fn is_busy(&self, channel: ChannelId) -> bool;
}
