//! Store traits
//!
//! These abstract persistence so the playback engine can run against SQLite
//! (`reprise-storage`), the in-memory [`MemoryStore`](crate::MemoryStore), or
//! anything else that can keep rows keyed by `(track_id, playlist_id)`.

use crate::error::Result;
use crate::types::{Checkpoint, Playlist, PlaylistId, SessionState, Track, TrackId};
use async_trait::async_trait;

/// Persistent, ordered collection of tracks per playlist
#[async_trait]
pub trait TrackStore: Send + Sync {
    // ========================================================================
    // Reads
    // ========================================================================

    /// Every track row across all playlists
    async fn list_all_tracks(&self) -> Result<Vec<Track>>;

    /// Tracks of one playlist, ordered by `position`
    async fn list_tracks(&self, playlist_id: PlaylistId) -> Result<Vec<Track>>;

    /// Tracks of one playlist that hold a stack slot, ordered by that slot
    async fn list_shuffle_history(&self, playlist_id: PlaylistId) -> Result<Vec<Track>>;

    // ========================================================================
    // Writes
    // ========================================================================

    /// Insert or replace a single row
    async fn upsert_track(&self, track: &Track) -> Result<()>;

    /// Insert or replace many rows atomically
    async fn upsert_tracks(&self, tracks: &[Track]) -> Result<()>;

    /// Move a row to a new `position`
    async fn update_position(
        &self,
        track_id: &TrackId,
        playlist_id: PlaylistId,
        position: u32,
    ) -> Result<()>;

    /// Assign (or clear, with `None`) a row's shuffle-history slot
    async fn update_stack_position(
        &self,
        track_id: &TrackId,
        playlist_id: PlaylistId,
        slot: Option<u32>,
    ) -> Result<()>;

    /// Clear every shuffle-history slot of a playlist
    async fn clear_stack_positions(&self, playlist_id: PlaylistId) -> Result<()>;

    /// Delete rows, matched by `(id, playlist_id)`
    async fn delete_tracks(&self, tracks: &[Track]) -> Result<()>;
}

/// Playlists and their resume checkpoints
#[async_trait]
pub trait PlaylistStore: Send + Sync {
    /// Create an empty playlist
    async fn create_playlist(&self, name: &str) -> Result<Playlist>;

    /// All playlists, oldest first
    async fn list_playlists(&self) -> Result<Vec<Playlist>>;

    /// Playlist by ID
    async fn get_playlist(&self, id: PlaylistId) -> Result<Option<Playlist>>;

    /// Write the resume fields of `checkpoint.playlist_id`
    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()>;

    /// Delete a playlist and its tracks
    ///
    /// Returns `false` if the playlist did not exist.
    async fn delete_playlist(&self, id: PlaylistId) -> Result<bool>;
}

/// Singleton session state
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Stored state, or the default when nothing was saved yet
    async fn load_session_state(&self) -> Result<SessionState>;

    /// Replace the stored state
    async fn save_session_state(&self, state: &SessionState) -> Result<()>;
}
