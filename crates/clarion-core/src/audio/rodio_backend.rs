//! Rodio-backed audio playback.
//!
//! `OutputStream` is not `Send`, so a dedicated thread owns the stream and
//! every `Sink`, driven by a command channel. Callers block only on `Play`
//! (to learn whether decoding worked); volume changes and stops are
//! fire-and-forget.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{debug, warn};

use super::{AudioBackend, ChannelId, SoundHandle};
use crate::error::AudioError;

const PLAY_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

enum AudioCommand {
    Play {
        path: PathBuf,
        channel: ChannelId,
        done: Sender<Result<(), AudioError>>,
    },
    SetVolume {
        channel: ChannelId,
        volume: f32,
    },
    Stop {
        channel: ChannelId,
    },
}

pub struct RodioBackend {
    tx: Mutex<Option<Sender<AudioCommand>>>,
    busy: Arc<Mutex<HashSet<ChannelId>>>,
    next_channel: AtomicU64,
    /// Base directory for bare sound names; absolute references bypass it.
    sound_dir: Option<PathBuf>,
}

impl RodioBackend {
    pub fn new(sound_dir: Option<PathBuf>) -> Self {
        Self {
            tx: Mutex::new(None),
            busy: Arc::new(Mutex::new(HashSet::new())),
            next_channel: AtomicU64::new(0),
            sound_dir,
        }
    }

    /// Spawn the audio thread on first use and hand back its sender.
    fn sender(&self) -> Result<Sender<AudioCommand>, AudioError> {
        let mut guard = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }
        let (tx, rx) = mpsc::channel();
        let busy = Arc::clone(&self.busy);
        thread::Builder::new()
            .name("clarion-audio".to_string())
            .spawn(move || audio_thread(rx, busy))
            .map_err(|e| AudioError::Unavailable(e.to_string()))?;
        *guard = Some(tx.clone());
        Ok(tx)
    }
}

impl AudioBackend for RodioBackend {
    fn resolve(&self, reference: &str) -> Result<SoundHandle, AudioError> {
        if reference.is_empty() {
            return Err(AudioError::SoundNotFound(reference.to_string()));
        }
        let direct = PathBuf::from(reference);
        if direct.is_file() {
            return Ok(SoundHandle::new(direct));
        }
        if let Some(dir) = &self.sound_dir {
            let joined = dir.join(reference);
            if joined.is_file() {
                return Ok(SoundHandle::new(joined));
            }
        }
        Err(AudioError::SoundNotFound(reference.to_string()))
    }

    fn play_looped(&self, sound: &SoundHandle) -> Result<ChannelId, AudioError> {
        let channel = ChannelId(self.next_channel.fetch_add(1, Ordering::SeqCst) + 1);
        let tx = self.sender()?;
        let (done_tx, done_rx) = mpsc::channel();
        tx.send(AudioCommand::Play {
            path: sound.path().to_path_buf(),
            channel,
            done: done_tx,
        })
        .map_err(|_| AudioError::Unavailable("audio thread stopped".to_string()))?;
        done_rx
            .recv_timeout(PLAY_REPLY_TIMEOUT)
            .map_err(|e| AudioError::Unavailable(e.to_string()))??;
        Ok(channel)
    }

    fn set_volume(&self, channel: ChannelId, volume: f32) {
        if let Ok(tx) = self.sender() {
            let _ = tx.send(AudioCommand::SetVolume { channel, volume });
        }
    }

    fn stop(&self, channel: ChannelId) {
        if let Ok(tx) = self.sender() {
            let _ = tx.send(AudioCommand::Stop { channel });
        }
    }

    fn is_busy(&self, channel: ChannelId) -> bool {
        self.busy
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&channel)
    }
}

fn audio_thread(rx: Receiver<AudioCommand>, busy: Arc<Mutex<HashSet<ChannelId>>>) {
    // Stream creation is deferred to the first Play so that merely
    // constructing the backend works on machines without an audio device.
    let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
    let mut sinks: HashMap<ChannelId, Sink> = HashMap::new();

    let mark_busy = |busy: &Mutex<HashSet<ChannelId>>, channel, on| {
        let mut set = busy.lock().unwrap_or_else(|e| e.into_inner());
        if on {
            set.insert(channel);
        } else {
            set.remove(&channel);
        }
    };

    while let Ok(command) = rx.recv() {
        match command {
            AudioCommand::Play { path, channel, done } => {
                let result = (|| {
                    if output.is_none() {
                        output = Some(
                            OutputStream::try_default()
                                .map_err(|e| AudioError::Unavailable(e.to_string()))?,
                        );
                    }
                    let (_, handle) = output.as_ref().ok_or(AudioError::NoChannel)?;
                    let sink = Sink::try_new(handle)
                        .map_err(|e| AudioError::Playback(e.to_string()))?;
                    let file = File::open(&path)
                        .map_err(|e| AudioError::SoundNotFound(format!("{}: {e}", path.display())))?;
                    let source = Decoder::new(BufReader::new(file))
                        .map_err(|e| AudioError::Playback(e.to_string()))?;
                    sink.set_volume(0.0);
                    sink.append(source.repeat_infinite());
                    sinks.insert(channel, sink);
                    mark_busy(&busy, channel, true);
                    debug!(%channel, path = %path.display(), "looped playback started");
                    Ok(())
                })();
                let _ = done.send(result);
            }
            AudioCommand::SetVolume { channel, volume } => {
                if let Some(sink) = sinks.get(&channel) {
                    sink.set_volume(volume);
                }
            }
            AudioCommand::Stop { channel } => {
                if let Some(sink) = sinks.remove(&channel) {
                    sink.stop();
                }
                mark_busy(&busy, channel, false);
            }
        }
    }
    if !sinks.is_empty() {
        warn!(count = sinks.len(), "audio thread exiting with live sinks");
    }
}
