//! Platform-agnostic audio collaborators
//!
//! The decoder/renderer, the OS audio-focus arbiter and the file check are
//! provided by the platform through these traits. Asynchronous happenings
//! (end of track, focus changes, output unplugged) flow back to the player
//! through [`EngineEvents`].

use crate::error::Result;
use async_trait::async_trait;
use reprise_core::Track;
use tokio::sync::mpsc;

/// Opaque audio engine
///
/// Methods take `&self`; implementations keep their own interior state.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Prepare `track` for playback, replacing whatever was loaded
    async fn load(&self, track: &Track) -> Result<()>;

    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    /// Jump to `position_ms` from the start of the loaded track
    fn seek(&self, position_ms: u64) -> Result<()>;

    /// Halt output and unload the track
    fn stop(&self) -> Result<()>;

    /// Playback position of the loaded track
    fn position_ms(&self) -> u64;

    /// Output gain, 0.0 - 1.0
    fn set_volume(&self, volume: f32);

    /// Receive the sink for end-of-track and output events
    fn attach(&self, events: EngineEvents);
}

/// Outcome of an audio focus request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequest {
    Granted,
    Denied,
}

/// Audio focus arbitration
pub trait AudioFocus: Send + Sync {
    fn request(&self) -> FocusRequest;

    fn abandon(&self);

    /// Receive the sink for focus changes
    fn attach(&self, _events: EngineEvents) {}
}

/// Focus change reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChange {
    /// Another app took focus for good
    Lost,

    /// Another app needs exclusive output for a while
    LostTransient,

    /// Another app plays briefly; we may keep playing quieter
    LostTransientCanDuck,

    /// Focus came back
    Gained,
}

/// Asynchronous notification from the audio side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    TrackEnded,
    Focus(FocusChange),
    OutputDisconnected,
}

/// Sending half for [`EngineEvent`]s
///
/// Cheap to clone. Sends after the player has shut down are dropped.
#[derive(Debug, Clone)]
pub struct EngineEvents {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EngineEvents {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn track_ended(&self) {
        self.send(EngineEvent::TrackEnded);
    }

    pub fn focus_changed(&self, change: FocusChange) {
        self.send(EngineEvent::Focus(change));
    }

    pub fn output_disconnected(&self) {
        self.send(EngineEvent::OutputDisconnected);
    }

    fn send(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Dropped {:?}: player is gone", event);
        }
    }
}

/// Check that a track can be loaded before handing it to the engine
#[async_trait]
pub trait TrackProbe: Send + Sync {
    async fn is_reachable(&self, track: &Track) -> bool;
}

/// Probe for local files
///
/// Accepts plain paths and `file://` URIs; anything else is unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileProbe;

#[async_trait]
impl TrackProbe for FileProbe {
    async fn is_reachable(&self, track: &Track) -> bool {
        let Some(path) = track.file_path() else {
            return false;
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => tokio::fs::File::open(&path).await.is_ok(),
            _ => false,
        }
    }
}

/// Focus arbiter that always grants
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl AudioFocus for AlwaysGranted {
    fn request(&self) -> FocusRequest {
        FocusRequest::Granted
    }

    fn abandon(&self) {}
}
