//! In-memory store
//!
//! Implements every store trait over plain collections. Nothing survives the
//! process; useful for tests and for ephemeral sessions.

use crate::error::{CoreError, Result};
use crate::traits::{PlaylistStore, SessionStore, TrackStore};
use crate::types::{Checkpoint, Playlist, PlaylistId, SessionState, Track, TrackId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    playlists: BTreeMap<PlaylistId, Playlist>,
    next_playlist_id: i64,
    tracks: Vec<Track>,
    session: SessionState,
}

impl Inner {
    fn find_track_mut(&mut self, track_id: &TrackId, playlist_id: PlaylistId) -> Option<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|t| &t.id == track_id && t.playlist_id == playlist_id)
    }

    fn upsert(&mut self, track: &Track) {
        match self.find_track_mut(&track.id, track.playlist_id) {
            Some(existing) => *existing = track.clone(),
            None => self.tracks.push(track.clone()),
        }
    }
}

/// Store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| CoreError::storage("memory store lock poisoned"))
    }
}

#[async_trait]
impl TrackStore for MemoryStore {
    async fn list_all_tracks(&self) -> Result<Vec<Track>> {
        let inner = self.lock()?;
        let mut tracks = inner.tracks.clone();
        tracks.sort_by_key(|t| (t.playlist_id, t.position));
        Ok(tracks)
    }

    async fn list_tracks(&self, playlist_id: PlaylistId) -> Result<Vec<Track>> {
        let inner = self.lock()?;
        let mut tracks: Vec<Track> = inner
            .tracks
            .iter()
            .filter(|t| t.playlist_id == playlist_id)
            .cloned()
            .collect();
        tracks.sort_by_key(|t| t.position);
        Ok(tracks)
    }

    async fn list_shuffle_history(&self, playlist_id: PlaylistId) -> Result<Vec<Track>> {
        let inner = self.lock()?;
        let mut tracks: Vec<Track> = inner
            .tracks
            .iter()
            .filter(|t| t.playlist_id == playlist_id && t.position_in_stack.is_some())
            .cloned()
            .collect();
        tracks.sort_by_key(|t| t.position_in_stack);
        Ok(tracks)
    }

    async fn upsert_track(&self, track: &Track) -> Result<()> {
        self.lock()?.upsert(track);
        Ok(())
    }

    async fn upsert_tracks(&self, tracks: &[Track]) -> Result<()> {
        let mut inner = self.lock()?;
        for track in tracks {
            inner.upsert(track);
        }
        Ok(())
    }

    async fn update_position(
        &self,
        track_id: &TrackId,
        playlist_id: PlaylistId,
        position: u32,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        let track = inner
            .find_track_mut(track_id, playlist_id)
            .ok_or_else(|| CoreError::TrackNotFound {
                track_id: track_id.clone(),
                playlist_id,
            })?;
        track.position = position;
        Ok(())
    }

    async fn update_stack_position(
        &self,
        track_id: &TrackId,
        playlist_id: PlaylistId,
        slot: Option<u32>,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        let track = inner
            .find_track_mut(track_id, playlist_id)
            .ok_or_else(|| CoreError::TrackNotFound {
                track_id: track_id.clone(),
                playlist_id,
            })?;
        track.position_in_stack = slot;
        Ok(())
    }

    async fn clear_stack_positions(&self, playlist_id: PlaylistId) -> Result<()> {
        let mut inner = self.lock()?;
        for track in inner.tracks.iter_mut().filter(|t| t.playlist_id == playlist_id) {
            track.position_in_stack = None;
        }
        Ok(())
    }

    async fn delete_tracks(&self, tracks: &[Track]) -> Result<()> {
        let mut inner = self.lock()?;
        inner.tracks.retain(|row| {
            !tracks
                .iter()
                .any(|t| t.id == row.id && t.playlist_id == row.playlist_id)
        });
        Ok(())
    }
}

#[async_trait]
impl PlaylistStore for MemoryStore {
    async fn create_playlist(&self, name: &str) -> Result<Playlist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::invalid_input("playlist name must not be empty"));
        }

        let mut inner = self.lock()?;
        inner.next_playlist_id += 1;
        let playlist = Playlist {
            id: PlaylistId::new(inner.next_playlist_id),
            name: name.to_string(),
            last_played_track_id: None,
            last_played_position_ms: 0,
        };
        inner.playlists.insert(playlist.id, playlist.clone());
        Ok(playlist)
    }

    async fn list_playlists(&self) -> Result<Vec<Playlist>> {
        Ok(self.lock()?.playlists.values().cloned().collect())
    }

    async fn get_playlist(&self, id: PlaylistId) -> Result<Option<Playlist>> {
        Ok(self.lock()?.playlists.get(&id).cloned())
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut inner = self.lock()?;
        let playlist = inner
            .playlists
            .get_mut(&checkpoint.playlist_id)
            .ok_or(CoreError::PlaylistNotFound(checkpoint.playlist_id))?;
        playlist.last_played_track_id.clone_from(&checkpoint.track_id);
        playlist.last_played_position_ms = checkpoint.position_ms;
        Ok(())
    }

    async fn delete_playlist(&self, id: PlaylistId) -> Result<bool> {
        let mut inner = self.lock()?;
        let existed = inner.playlists.remove(&id).is_some();
        inner.tracks.retain(|t| t.playlist_id != id);
        if inner.session.active_playlist_id == Some(id) {
            inner.session.active_playlist_id = None;
        }
        Ok(existed)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_session_state(&self) -> Result<SessionState> {
        Ok(self.lock()?.session)
    }

    async fn save_session_state(&self, state: &SessionState) -> Result<()> {
        self.lock()?.session = *state;
        Ok(())
    }
}
