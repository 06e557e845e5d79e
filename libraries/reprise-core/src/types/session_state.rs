/// Persisted session state, restored on process start
use super::ids::PlaylistId;
use serde::{Deserialize, Serialize};

/// Which playlist was active and how it was being traversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Playlist whose queue session was open
    pub active_playlist_id: Option<PlaylistId>,

    /// Whether shuffle traversal was on
    pub shuffle_enabled: bool,

    /// Whether the current track loops
    pub repeat_one: bool,

    /// Whether audio was playing when this was written
    pub was_playing: bool,
}
