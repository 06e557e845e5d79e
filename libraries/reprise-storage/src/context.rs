use crate::{playlists, session_state, tracks};
use async_trait::async_trait;
use reprise_core::{
    error::Result, Checkpoint, Playlist, PlaylistId, PlaylistStore, SessionState, SessionStore,
    Track, TrackId, TrackStore,
};
use sqlx::SqlitePool;

/// Store context over a `SQLite` pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl TrackStore for SqliteStore {
    async fn list_all_tracks(&self) -> Result<Vec<Track>> {
        tracks::get_all(&self.pool).await
    }

    async fn list_tracks(&self, playlist_id: PlaylistId) -> Result<Vec<Track>> {
        tracks::get_by_playlist(&self.pool, playlist_id).await
    }

    async fn list_shuffle_history(&self, playlist_id: PlaylistId) -> Result<Vec<Track>> {
        tracks::get_shuffle_history(&self.pool, playlist_id).await
    }

    async fn upsert_track(&self, track: &Track) -> Result<()> {
        tracks::upsert(&self.pool, track).await
    }

    async fn upsert_tracks(&self, rows: &[Track]) -> Result<()> {
        tracks::upsert_many(&self.pool, rows).await
    }

    async fn update_position(
        &self,
        track_id: &TrackId,
        playlist_id: PlaylistId,
        position: u32,
    ) -> Result<()> {
        tracks::update_position(&self.pool, track_id, playlist_id, position).await
    }

    async fn update_stack_position(
        &self,
        track_id: &TrackId,
        playlist_id: PlaylistId,
        slot: Option<u32>,
    ) -> Result<()> {
        tracks::update_stack_position(&self.pool, track_id, playlist_id, slot).await
    }

    async fn clear_stack_positions(&self, playlist_id: PlaylistId) -> Result<()> {
        tracks::clear_stack_positions(&self.pool, playlist_id).await
    }

    async fn delete_tracks(&self, rows: &[Track]) -> Result<()> {
        tracks::delete_many(&self.pool, rows).await
    }
}

#[async_trait]
impl PlaylistStore for SqliteStore {
    async fn create_playlist(&self, name: &str) -> Result<Playlist> {
        playlists::create(&self.pool, name).await
    }

    async fn list_playlists(&self) -> Result<Vec<Playlist>> {
        playlists::get_all(&self.pool).await
    }

    async fn get_playlist(&self, id: PlaylistId) -> Result<Option<Playlist>> {
        playlists::get_by_id(&self.pool, id).await
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        playlists::save_checkpoint(&self.pool, checkpoint).await
    }

    async fn delete_playlist(&self, id: PlaylistId) -> Result<bool> {
        playlists::delete(&self.pool, id).await
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn load_session_state(&self) -> Result<SessionState> {
        session_state::get(&self.pool).await
    }

    async fn save_session_state(&self, state: &SessionState) -> Result<()> {
        session_state::upsert(&self.pool, state).await
    }
}
