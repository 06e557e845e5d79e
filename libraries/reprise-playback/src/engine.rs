//! Queue engine
//!
//! Owns the live [`QueueSession`] and keeps the track store in step with it.
//! Store writes queued by the session are flushed after every operation; a
//! failed flush keeps the unwritten remainder for the next one.

use crate::error::Result;
use crate::queue::{PendingWrite, QueueSession};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reprise_core::{NewTrack, PlaylistId, Track, TrackId, TrackStore};
use std::sync::Arc;

/// Queue & shuffle engine over a track store
pub struct QueueEngine {
    store: Arc<dyn TrackStore>,
    session: Option<QueueSession>,
    shuffle_enabled: bool,
    rng: StdRng,
}

impl QueueEngine {
    pub fn new(store: Arc<dyn TrackStore>, shuffle_enabled: bool) -> Self {
        Self::with_rng(store, shuffle_enabled, StdRng::from_entropy())
    }

    /// Engine with reproducible shuffles
    pub fn with_seed(store: Arc<dyn TrackStore>, shuffle_enabled: bool, seed: u64) -> Self {
        Self::with_rng(store, shuffle_enabled, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: Arc<dyn TrackStore>, shuffle_enabled: bool, rng: StdRng) -> Self {
        Self {
            store,
            session: None,
            shuffle_enabled,
            rng,
        }
    }

    // ===== Queries =====

    pub fn session(&self) -> Option<&QueueSession> {
        self.session.as_ref()
    }

    pub fn playlist_id(&self) -> Option<PlaylistId> {
        self.session.as_ref().map(QueueSession::playlist_id)
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle_enabled
    }

    pub fn len(&self) -> usize {
        self.session.as_ref().map_or(0, QueueSession::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current track without side effects
    pub fn peek_current(&self) -> Option<&Track> {
        self.session.as_ref().and_then(QueueSession::peek_current)
    }

    pub fn is_ended(&self) -> bool {
        self.session.as_ref().is_some_and(QueueSession::is_ended)
    }

    // ===== Activation =====

    /// Make `playlist_id` the active playlist, positioned at `start_index`
    pub async fn switch_playlist(
        &mut self,
        playlist_id: PlaylistId,
        start_index: usize,
    ) -> Result<Option<Track>> {
        let rows = self.store.list_tracks(playlist_id).await?;
        self.open(playlist_id, rows, start_index).await
    }

    /// Make `playlist_id` the active playlist, positioned on `track_id`
    ///
    /// Falls back to the first track when `track_id` is `None` or not in the playlist.
    pub async fn switch_to_track(
        &mut self,
        playlist_id: PlaylistId,
        track_id: Option<&TrackId>,
    ) -> Result<Option<Track>> {
        let mut rows = self.store.list_tracks(playlist_id).await?;
        rows.sort_by_key(|t| t.position);
        let start_index = track_id
            .and_then(|id| rows.iter().position(|t| &t.id == id))
            .unwrap_or(0);
        self.open(playlist_id, rows, start_index).await
    }

    async fn open(
        &mut self,
        playlist_id: PlaylistId,
        rows: Vec<Track>,
        start_index: usize,
    ) -> Result<Option<Track>> {
        let rng = StdRng::seed_from_u64(self.rng.gen());
        self.session = Some(QueueSession::open(
            playlist_id,
            rows,
            start_index,
            self.shuffle_enabled,
            rng,
        ));

        tracing::info!(
            "Activated playlist {} with {} tracks",
            playlist_id,
            self.len()
        );

        let current = self.current().await;
        Ok(current)
    }

    /// Drop the queue session if it belongs to `playlist_id`
    ///
    /// Returns `true` if the active session was dropped.
    pub fn deactivate(&mut self, playlist_id: PlaylistId) -> bool {
        if self.playlist_id() == Some(playlist_id) {
            self.session = None;
            tracing::info!("Deactivated playlist {}", playlist_id);
            true
        } else {
            false
        }
    }

    // ===== Traversal =====

    pub async fn current(&mut self) -> Option<Track> {
        let track = self.session.as_mut()?.current().cloned();
        self.flush().await;
        track
    }

    pub async fn next(&mut self) -> Option<Track> {
        let track = self.session.as_mut()?.next().cloned();
        self.flush().await;
        if let Some(track) = &track {
            tracing::debug!("Queue advanced to {}", track.id);
        }
        track
    }

    pub async fn previous(&mut self) -> Option<Track> {
        let track = self.session.as_mut()?.previous().cloned();
        self.flush().await;
        if let Some(track) = &track {
            tracing::debug!("Queue stepped back to {}", track.id);
        }
        track
    }

    /// Jump to a track of the active playlist
    pub async fn select(&mut self, track_id: &TrackId) -> Option<Track> {
        let track = self.session.as_mut()?.select(track_id).cloned();
        self.flush().await;
        track
    }

    pub async fn set_shuffle(&mut self, enabled: bool) {
        self.shuffle_enabled = enabled;
        if let Some(session) = self.session.as_mut() {
            session.set_shuffle(enabled);
        }
        self.flush().await;
        tracing::info!("Shuffle {}", if enabled { "enabled" } else { "disabled" });
    }

    // ===== Editing =====

    /// Reload the active playlist from the store and re-sync the session
    pub async fn reconcile(&mut self, removed: &[TrackId]) -> Result<()> {
        let Some(playlist_id) = self.playlist_id() else {
            return Ok(());
        };

        // Anything queued must land before the reload reads it back
        self.flush().await;
        let rows = self.store.list_tracks(playlist_id).await?;

        if let Some(session) = self.session.as_mut() {
            session.reconcile(rows, removed);
        }
        self.flush().await;
        Ok(())
    }

    /// Append tracks to the end of the active playlist
    ///
    /// Tracks already in the playlist are skipped. Returns how many were added.
    pub async fn append_tracks(&mut self, tracks: Vec<NewTrack>) -> Result<usize> {
        let Some(session) = self.session.as_ref() else {
            return Ok(0);
        };

        let playlist_id = session.playlist_id();
        let mut next_position = session.len() as u32;
        let mut rows = Vec::new();
        for new_track in tracks {
            if session.contains(&new_track.id) || rows.iter().any(|t: &Track| t.id == new_track.id) {
                continue;
            }
            rows.push(new_track.into_track(playlist_id, next_position));
            next_position += 1;
        }

        if rows.is_empty() {
            return Ok(0);
        }

        self.store.upsert_tracks(&rows).await?;
        self.reconcile(&[]).await?;

        tracing::info!("Appended {} tracks to playlist {}", rows.len(), playlist_id);
        Ok(rows.len())
    }

    /// Move the track at position `from` to position `to`
    pub async fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };

        let len = session.len();
        if from >= len || to >= len {
            return Err(crate::PlaybackError::invalid(format!(
                "move {} -> {} outside a queue of {}",
                from, to, len
            )));
        }
        if from == to {
            return Ok(());
        }

        let playlist_id = session.playlist_id();
        let mut order: Vec<TrackId> = session.tracks().iter().map(|t| t.id.clone()).collect();
        let moved = order.remove(from);
        order.insert(to, moved);

        let (low, high) = (from.min(to), from.max(to));
        for (position, track_id) in order.iter().enumerate().take(high + 1).skip(low) {
            self.store
                .update_position(track_id, playlist_id, position as u32)
                .await?;
        }

        self.reconcile(&[]).await
    }

    /// Remove tracks from the active playlist
    ///
    /// Returns how many rows were deleted.
    pub async fn remove_tracks(&mut self, track_ids: &[TrackId]) -> Result<usize> {
        let Some(session) = self.session.as_ref() else {
            return Ok(0);
        };

        let doomed: Vec<Track> = session
            .tracks()
            .iter()
            .filter(|t| track_ids.contains(&t.id))
            .cloned()
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        self.store.delete_tracks(&doomed).await?;
        let removed: Vec<TrackId> = doomed.iter().map(|t| t.id.clone()).collect();
        self.reconcile(&removed).await?;

        tracing::info!("Removed {} tracks from the queue", doomed.len());
        Ok(doomed.len())
    }

    // ===== Persistence =====

    /// Write queued slot and position changes to the store
    pub async fn flush(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let playlist_id = session.playlist_id();
        let writes = session.take_pending_writes();

        for (i, write) in writes.iter().enumerate() {
            if let Err(e) = apply(self.store.as_ref(), playlist_id, write).await {
                tracing::warn!(
                    "Queue write failed for playlist {} ({} pending): {}",
                    playlist_id,
                    writes.len() - i,
                    e
                );
                session.requeue_writes(writes[i..].to_vec());
                return;
            }
        }
    }
}

async fn apply(
    store: &dyn TrackStore,
    playlist_id: PlaylistId,
    write: &PendingWrite,
) -> reprise_core::Result<()> {
    match write {
        PendingWrite::ClearStack => store.clear_stack_positions(playlist_id).await,
        PendingWrite::StackSlot { track_id, slot } => {
            store.update_stack_position(track_id, playlist_id, *slot).await
        }
        PendingWrite::Position { track_id, position } => {
            store.update_position(track_id, playlist_id, *position).await
        }
    }
}
