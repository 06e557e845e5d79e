//! Shared fixtures for the playback integration tests

use async_trait::async_trait;
use reprise_core::{
    Checkpoint, CoreError, MemoryStore, NewTrack, Playlist, PlaylistId, PlaylistStore,
    SessionState, SessionStore, Track, TrackId, TrackStore,
};
use reprise_playback::timers::TimerFired;
use reprise_playback::{
    AudioEngine, AudioFocus, Collaborators, EngineEvents, FocusChange, FocusRequest,
    PlaybackConfig, PlaybackSession, TrackProbe,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// ===== Audio engine =====

#[derive(Debug, Default)]
pub struct EngineState {
    pub loaded: Option<TrackId>,
    pub playing: bool,
    pub position_ms: u64,
    pub volume: Option<f32>,
    pub loads: Vec<TrackId>,
    pub stops: usize,
}

/// Engine that records what it was told to do
#[derive(Default)]
pub struct MockEngine {
    state: Mutex<EngineState>,
    events: Mutex<Option<EngineEvents>>,
    fail_load: AtomicBool,
}

impl MockEngine {
    pub fn loaded(&self) -> Option<TrackId> {
        self.state.lock().unwrap().loaded.clone()
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn volume(&self) -> Option<f32> {
        self.state.lock().unwrap().volume
    }

    pub fn loads(&self) -> Vec<TrackId> {
        self.state.lock().unwrap().loads.clone()
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }

    /// Pretend playback advanced to `position_ms`
    pub fn advance_to(&self, position_ms: u64) {
        self.state.lock().unwrap().position_ms = position_ms;
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    /// Report the end of the loaded track through the attached sink
    pub fn finish_track(&self) {
        self.state.lock().unwrap().playing = false;
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            events.track_ended();
        }
    }

    pub fn unplug(&self) {
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            events.output_disconnected();
        }
    }
}

#[async_trait]
impl AudioEngine for MockEngine {
    async fn load(&self, track: &Track) -> reprise_playback::Result<()> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(reprise_playback::PlaybackError::audio("decoder refused"));
        }
        let mut state = self.state.lock().unwrap();
        state.loaded = Some(track.id.clone());
        state.loads.push(track.id.clone());
        state.playing = false;
        state.position_ms = 0;
        Ok(())
    }

    fn play(&self) -> reprise_playback::Result<()> {
        self.state.lock().unwrap().playing = true;
        Ok(())
    }

    fn pause(&self) -> reprise_playback::Result<()> {
        self.state.lock().unwrap().playing = false;
        Ok(())
    }

    fn seek(&self, position_ms: u64) -> reprise_playback::Result<()> {
        self.state.lock().unwrap().position_ms = position_ms;
        Ok(())
    }

    fn stop(&self) -> reprise_playback::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.loaded = None;
        state.playing = false;
        state.stops += 1;
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        self.state.lock().unwrap().position_ms
    }

    fn set_volume(&self, volume: f32) {
        self.state.lock().unwrap().volume = Some(volume);
    }

    fn attach(&self, events: EngineEvents) {
        *self.events.lock().unwrap() = Some(events);
    }
}

// ===== Audio focus =====

/// Focus arbiter that can be told to refuse
#[derive(Default)]
pub struct MockFocus {
    deny: AtomicBool,
    requests: Mutex<usize>,
    abandons: Mutex<usize>,
    events: Mutex<Option<EngineEvents>>,
}

impl MockFocus {
    pub fn deny(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        *self.requests.lock().unwrap()
    }

    pub fn abandons(&self) -> usize {
        *self.abandons.lock().unwrap()
    }

    /// Deliver a focus change through the attached sink
    pub fn change(&self, change: FocusChange) {
        if let Some(events) = self.events.lock().unwrap().as_ref() {
            events.focus_changed(change);
        }
    }
}

impl AudioFocus for MockFocus {
    fn request(&self) -> FocusRequest {
        *self.requests.lock().unwrap() += 1;
        if self.deny.load(Ordering::SeqCst) {
            FocusRequest::Denied
        } else {
            FocusRequest::Granted
        }
    }

    fn abandon(&self) {
        *self.abandons.lock().unwrap() += 1;
    }

    fn attach(&self, events: EngineEvents) {
        *self.events.lock().unwrap() = Some(events);
    }
}

// ===== Track probe =====

/// Every track is reachable unless marked otherwise
#[derive(Default)]
pub struct MockProbe {
    unreachable: Mutex<HashSet<TrackId>>,
}

impl MockProbe {
    pub fn mark_unreachable(&self, track_id: &TrackId) {
        self.unreachable.lock().unwrap().insert(track_id.clone());
    }

    pub fn mark_reachable(&self, track_id: &TrackId) {
        self.unreachable.lock().unwrap().remove(track_id);
    }
}

#[async_trait]
impl TrackProbe for MockProbe {
    async fn is_reachable(&self, track: &Track) -> bool {
        !self.unreachable.lock().unwrap().contains(&track.id)
    }
}

// ===== Store =====

/// Memory store whose checkpoint writes can be made to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_checkpoints: AtomicBool,
}

impl FlakyStore {
    pub fn fail_checkpoints(&self, fail: bool) {
        self.fail_checkpoints.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TrackStore for FlakyStore {
    async fn list_all_tracks(&self) -> reprise_core::Result<Vec<Track>> {
        self.inner.list_all_tracks().await
    }

    async fn list_tracks(&self, playlist_id: PlaylistId) -> reprise_core::Result<Vec<Track>> {
        self.inner.list_tracks(playlist_id).await
    }

    async fn list_shuffle_history(
        &self,
        playlist_id: PlaylistId,
    ) -> reprise_core::Result<Vec<Track>> {
        self.inner.list_shuffle_history(playlist_id).await
    }

    async fn upsert_track(&self, track: &Track) -> reprise_core::Result<()> {
        self.inner.upsert_track(track).await
    }

    async fn upsert_tracks(&self, tracks: &[Track]) -> reprise_core::Result<()> {
        self.inner.upsert_tracks(tracks).await
    }

    async fn update_position(
        &self,
        track_id: &TrackId,
        playlist_id: PlaylistId,
        position: u32,
    ) -> reprise_core::Result<()> {
        self.inner
            .update_position(track_id, playlist_id, position)
            .await
    }

    async fn update_stack_position(
        &self,
        track_id: &TrackId,
        playlist_id: PlaylistId,
        slot: Option<u32>,
    ) -> reprise_core::Result<()> {
        self.inner
            .update_stack_position(track_id, playlist_id, slot)
            .await
    }

    async fn clear_stack_positions(&self, playlist_id: PlaylistId) -> reprise_core::Result<()> {
        self.inner.clear_stack_positions(playlist_id).await
    }

    async fn delete_tracks(&self, tracks: &[Track]) -> reprise_core::Result<()> {
        self.inner.delete_tracks(tracks).await
    }
}

#[async_trait]
impl PlaylistStore for FlakyStore {
    async fn create_playlist(&self, name: &str) -> reprise_core::Result<Playlist> {
        self.inner.create_playlist(name).await
    }

    async fn list_playlists(&self) -> reprise_core::Result<Vec<Playlist>> {
        self.inner.list_playlists().await
    }

    async fn get_playlist(&self, id: PlaylistId) -> reprise_core::Result<Option<Playlist>> {
        self.inner.get_playlist(id).await
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> reprise_core::Result<()> {
        if self.fail_checkpoints.load(Ordering::SeqCst) {
            return Err(CoreError::storage("disk full"));
        }
        self.inner.save_checkpoint(checkpoint).await
    }

    async fn delete_playlist(&self, id: PlaylistId) -> reprise_core::Result<bool> {
        self.inner.delete_playlist(id).await
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn load_session_state(&self) -> reprise_core::Result<SessionState> {
        self.inner.load_session_state().await
    }

    async fn save_session_state(&self, state: &SessionState) -> reprise_core::Result<()> {
        self.inner.save_session_state(state).await
    }
}

// ===== Fixture =====

pub struct Fixture {
    pub store: Arc<FlakyStore>,
    pub engine: Arc<MockEngine>,
    pub focus: Arc<MockFocus>,
    pub probe: Arc<MockProbe>,
    pub playlist: PlaylistId,
    pub tracks: Vec<Track>,
}

/// A store holding one playlist of `count` three-minute tracks
pub async fn fixture(count: u32) -> Fixture {
    let store = Arc::new(FlakyStore::default());
    let playlist = store.create_playlist("Test Mix").await.unwrap();
    let tracks = seed_tracks(&store, playlist.id, count).await;

    Fixture {
        store,
        engine: Arc::new(MockEngine::default()),
        focus: Arc::new(MockFocus::default()),
        probe: Arc::new(MockProbe::default()),
        playlist: playlist.id,
        tracks,
    }
}

pub async fn seed_tracks(store: &FlakyStore, playlist_id: PlaylistId, count: u32) -> Vec<Track> {
    let tracks: Vec<Track> = (0..count)
        .map(|i| {
            NewTrack::new(
                format!("/music/{}/track-{:02}.flac", playlist_id, i),
                format!("Track {}", i),
                "Test Artist",
            )
            .with_duration_ms(180_000)
            .into_track(playlist_id, i)
        })
        .collect();
    store.upsert_tracks(&tracks).await.unwrap();
    tracks
}

/// Deterministic config with fast timers
pub fn config() -> PlaybackConfig {
    PlaybackConfig {
        checkpoint_interval_ms: 1_000,
        inactivity_timeout_ms: 60_000,
        shuffle_seed: Some(7),
        ..PlaybackConfig::default()
    }
}

impl Fixture {
    pub fn id(&self, index: usize) -> TrackId {
        self.tracks[index].id.clone()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            self.store.clone(),
            self.engine.clone(),
            self.focus.clone(),
            self.probe.clone(),
        )
    }

    pub fn session(&self) -> (PlaybackSession, mpsc::Receiver<TimerFired>) {
        self.session_with(config())
    }

    pub fn session_with(
        &self,
        config: PlaybackConfig,
    ) -> (PlaybackSession, mpsc::Receiver<TimerFired>) {
        let (tx, rx) = mpsc::channel(16);
        (PlaybackSession::new(config, self.collaborators(), tx), rx)
    }

    /// A session already playing track `index`
    pub async fn playing_at(
        &self,
        index: usize,
    ) -> (PlaybackSession, mpsc::Receiver<TimerFired>) {
        let (mut session, rx) = self.session();
        session
            .select_track(self.playlist, &self.id(index), 0)
            .await
            .unwrap();
        (session, rx)
    }

    pub async fn checkpoint(&self) -> Playlist {
        self.store
            .get_playlist(self.playlist)
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn saved_session(&self) -> SessionState {
        self.store.load_session_state().await.unwrap()
    }
}
