//! Playlist and resume checkpoint types

use super::ids::{PlaylistId, TrackId};
use serde::{Deserialize, Serialize};

/// Playlist with its resume checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,

    /// Track that was current when the checkpoint was written
    pub last_played_track_id: Option<TrackId>,

    /// Position inside that track
    pub last_played_position_ms: u64,
}

impl Playlist {
    /// The resume checkpoint stored on this playlist
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            playlist_id: self.id,
            track_id: self.last_played_track_id.clone(),
            position_ms: self.last_played_position_ms,
        }
    }
}

/// Resume point written by the playback session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub playlist_id: PlaylistId,
    pub track_id: Option<TrackId>,
    pub position_ms: u64,
}

impl Checkpoint {
    /// Checkpoint with no track (written on Stop with an empty queue)
    pub fn empty(playlist_id: PlaylistId) -> Self {
        Self {
            playlist_id,
            track_id: None,
            position_ms: 0,
        }
    }
}
