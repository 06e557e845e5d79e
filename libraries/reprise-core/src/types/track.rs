//! Track types

use super::ids::{PlaylistId, TrackId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Persisted value of `position_in_stack` for tracks outside the shuffle history
pub const NO_STACK_SLOT: i64 = -1;

/// A track as it appears inside one playlist
///
/// The same media file may be part of several playlists; each membership is
/// its own row, keyed by `(id, playlist_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Stable identifier (content URI or file path)
    pub id: TrackId,

    /// Owning playlist
    pub playlist_id: PlaylistId,

    /// Order inside the playlist, contiguous from 0
    pub position: u32,

    pub title: String,
    pub artist: String,
    pub duration_ms: u64,

    /// Slot in the shuffle history, `None` when not visited in the current cycle
    pub position_in_stack: Option<u32>,
}

impl Track {
    /// Local file behind this track's id
    ///
    /// Accepts plain paths and `file://` URIs. Other schemes yield `None`.
    pub fn file_path(&self) -> Option<PathBuf> {
        let raw = self.id.as_str();
        if let Some(path) = raw.strip_prefix("file://") {
            return Some(PathBuf::from(path));
        }
        if raw.contains("://") {
            return None;
        }
        Some(PathBuf::from(raw))
    }

    /// Stack slot in its persisted form (`-1` when unassigned)
    pub fn stack_slot_column(&self) -> i64 {
        self.position_in_stack.map_or(NO_STACK_SLOT, i64::from)
    }

    /// Decode a persisted stack slot column
    pub fn stack_slot_from_column(value: i64) -> Option<u32> {
        u32::try_from(value).ok()
    }
}

/// Data for adding a track to a playlist
///
/// Metadata extraction happens outside Reprise; callers supply what they know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrack {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub duration_ms: u64,
}

impl NewTrack {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(id),
            title: title.into(),
            artist: artist.into(),
            duration_ms: 0,
        }
    }

    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Materialize the row for `playlist_id` at `position`
    pub fn into_track(self, playlist_id: PlaylistId, position: u32) -> Track {
        Track {
            id: self.id,
            playlist_id,
            position,
            title: self.title,
            artist: self.artist,
            duration_ms: self.duration_ms,
            position_in_stack: None,
        }
    }
}
