//! Core types for playback management

use reprise_core::{PlaylistId, Track};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing loaded, or the session was stopped
    #[default]
    Stopped,

    /// Track loaded, output halted
    Paused,

    /// Currently playing
    Playing,
}

/// Playback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Period of the checkpoint timer while playing
    pub checkpoint_interval_ms: u64,

    /// How long a pause may last before the session stops
    pub inactivity_timeout_ms: u64,

    /// Output volume while another app holds duckable focus (0.0 - 1.0)
    pub duck_volume: f32,

    /// Capacity of the command channel
    pub command_buffer: usize,

    /// Capacity of the event broadcast channel
    pub event_buffer: usize,

    /// Shuffle traversal when no saved session says otherwise
    pub shuffle: bool,

    /// Loop the current track when no saved session says otherwise
    pub repeat_one: bool,

    /// Fixed shuffle seed, for reproducible runs
    pub shuffle_seed: Option<u64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval_ms: 10_000,
            inactivity_timeout_ms: 300_000,
            duck_volume: 0.2,
            command_buffer: 64,
            event_buffer: 128,
            shuffle: false,
            repeat_one: false,
            shuffle_seed: None,
        }
    }
}

impl PlaybackConfig {
    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_millis(self.checkpoint_interval_ms.max(1))
    }

    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms.max(1))
    }
}

/// Point-in-time view of the player, published after every command
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub state: PlaybackState,
    pub repeat_one: bool,
    pub shuffle_enabled: bool,
    pub playlist_id: Option<PlaylistId>,
    pub current_track: Option<Track>,
    pub position_ms: u64,

    /// The session was restored and had been playing when it was saved
    pub resumed_from_playing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PlaybackConfig::default();
        assert_eq!(config.checkpoint_interval(), Duration::from_secs(10));
        assert_eq!(config.inactivity_timeout(), Duration::from_secs(300));
        assert!(!config.shuffle);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: PlaybackConfig =
            serde_json::from_str(r#"{"checkpoint_interval_ms": 500}"#).unwrap();
        assert_eq!(config.checkpoint_interval_ms, 500);
        assert_eq!(config.command_buffer, 64);
    }
}
