//! Playback Events
//!
//! Emitted by the session state machine and broadcast by the player:
//! - State changes (play/pause/stop)
//! - Track and playlist changes
//! - Traversal mode changes
//! - Notices the user should see

use crate::types::PlaybackState;
use reprise_core::{PlaylistId, TrackId};
use serde::{Deserialize, Serialize};

/// Events emitted by the playback system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Playback state changed
    StateChanged { state: PlaybackState },

    /// A different track became current
    TrackChanged {
        track_id: TrackId,
        previous_track_id: Option<TrackId>,
    },

    /// A different playlist became active (or none)
    PlaylistChanged { playlist_id: Option<PlaylistId> },

    ShuffleChanged { enabled: bool },

    RepeatOneChanged { enabled: bool },

    /// Tracks of the active playlist were added, moved or removed
    QueueChanged { len: usize },

    /// Something the user should be told about
    Notice(Notice),
}

/// Non-fatal, user-visible conditions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// Nothing playable is left
    EmptyQueue,

    /// The requested track cannot be read
    TrackUnreachable { track_id: TrackId },

    /// A skip passed over unreadable tracks
    TracksSkipped { track_ids: Vec<TrackId> },
}
