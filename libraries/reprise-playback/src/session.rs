//! Playback session state machine
//!
//! Drives the audio engine through Stopped / Paused / Playing:
//!
//! ```text
//!            play                      pause, focus lost,
//!   Stopped ──────────► Playing ◄────► Paused    output unplugged
//!      ▲                   │    play      │
//!      └───── stop ────────┴──────────────┘
//!            (or inactivity timeout while paused)
//! ```
//!
//! The queue engine picks tracks; this module checks they are readable,
//! loads them, arbitrates audio focus, and writes the resume checkpoint at
//! every transition and on a periodic timer while playing.

use crate::audio::{AudioEngine, AudioFocus, EngineEvent, FocusChange, FocusRequest, TrackProbe};
use crate::engine::QueueEngine;
use crate::error::{PlaybackError, Result};
use crate::events::{Notice, PlaybackEvent};
use crate::timers::{Timer, TimerFired, TimerKind};
use crate::types::{PlaybackConfig, PlaybackSnapshot, PlaybackState};
use reprise_core::{
    Checkpoint, NewTrack, PlaylistId, PlaylistStore, SessionState, SessionStore, Track, TrackId,
    TrackStore,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything the session talks to
pub struct Collaborators {
    pub tracks: Arc<dyn TrackStore>,
    pub playlists: Arc<dyn PlaylistStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub audio: Arc<dyn AudioEngine>,
    pub focus: Arc<dyn AudioFocus>,
    pub probe: Arc<dyn TrackProbe>,
}

impl Collaborators {
    /// Use one store for tracks, playlists and session state
    pub fn new<S>(
        store: Arc<S>,
        audio: Arc<dyn AudioEngine>,
        focus: Arc<dyn AudioFocus>,
        probe: Arc<dyn TrackProbe>,
    ) -> Self
    where
        S: TrackStore + PlaylistStore + SessionStore + 'static,
    {
        Self {
            tracks: store.clone(),
            playlists: store.clone(),
            sessions: store,
            audio,
            focus,
            probe,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Forward,
    Backward,
}

/// Outcome of walking the queue for a readable track
enum Walk {
    Playable(Track),
    /// A backward walk hit the start of the shuffle history and went back to its origin
    Floor,
    Exhausted,
}

/// Playback session state machine
pub struct PlaybackSession {
    config: PlaybackConfig,
    queue: QueueEngine,
    playlists: Arc<dyn PlaylistStore>,
    sessions: Arc<dyn SessionStore>,
    audio: Arc<dyn AudioEngine>,
    focus: Arc<dyn AudioFocus>,
    probe: Arc<dyn TrackProbe>,

    state: PlaybackState,
    repeat_one: bool,
    position_ms: u64,
    loaded: Option<TrackId>,
    resumed_from_playing: bool,

    has_focus: bool,
    ducked: bool,
    resume_on_focus_gain: bool,

    timer_tx: mpsc::Sender<TimerFired>,
    generation: u64,
    checkpoint_timer: Option<Timer>,
    inactivity_timer: Option<Timer>,

    persistence_failed: bool,
    announced_playlist: Option<PlaylistId>,
    announced_track: Option<TrackId>,
    pending_events: Vec<PlaybackEvent>,
}

impl PlaybackSession {
    /// Create a stopped session
    ///
    /// Timer fires are sent to `timer_tx`; the owner feeds them back through
    /// [`handle_timer`](Self::handle_timer).
    pub fn new(
        config: PlaybackConfig,
        collaborators: Collaborators,
        timer_tx: mpsc::Sender<TimerFired>,
    ) -> Self {
        let queue = match config.shuffle_seed {
            Some(seed) => QueueEngine::with_seed(collaborators.tracks, config.shuffle, seed),
            None => QueueEngine::new(collaborators.tracks, config.shuffle),
        };

        Self {
            repeat_one: config.repeat_one,
            config,
            queue,
            playlists: collaborators.playlists,
            sessions: collaborators.sessions,
            audio: collaborators.audio,
            focus: collaborators.focus,
            probe: collaborators.probe,
            state: PlaybackState::Stopped,
            position_ms: 0,
            loaded: None,
            resumed_from_playing: false,
            has_focus: false,
            ducked: false,
            resume_on_focus_gain: false,
            timer_tx,
            generation: 0,
            checkpoint_timer: None,
            inactivity_timer: None,
            persistence_failed: false,
            announced_playlist: None,
            announced_track: None,
            pending_events: Vec::new(),
        }
    }

    // ===== Queries =====

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn repeat_one(&self) -> bool {
        self.repeat_one
    }

    pub fn queue(&self) -> &QueueEngine {
        &self.queue
    }

    /// Position of the current track, live from the engine when one is loaded
    pub fn position_ms(&self) -> u64 {
        if self.loaded.is_some() && self.state != PlaybackState::Stopped {
            self.audio.position_ms()
        } else {
            self.position_ms
        }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            state: self.state,
            repeat_one: self.repeat_one,
            shuffle_enabled: self.queue.shuffle_enabled(),
            playlist_id: self.queue.playlist_id(),
            current_track: self.queue.peek_current().cloned(),
            position_ms: self.position_ms(),
            resumed_from_playing: self.resumed_from_playing,
        }
    }

    /// Drain events produced since the last call
    ///
    /// Track and playlist changes are announced here, once per command.
    pub fn take_events(&mut self) -> Vec<PlaybackEvent> {
        let playlist_id = self.queue.playlist_id();
        if playlist_id != self.announced_playlist {
            self.announced_playlist = playlist_id;
            self.pending_events
                .push(PlaybackEvent::PlaylistChanged { playlist_id });
        }

        let current = self.current_id();
        if current != self.announced_track {
            let previous_track_id = self.announced_track.take();
            if let Some(track_id) = current.clone() {
                self.pending_events.push(PlaybackEvent::TrackChanged {
                    track_id,
                    previous_track_id,
                });
            }
            self.announced_track = current;
        }

        std::mem::take(&mut self.pending_events)
    }

    // ===== Transport =====

    /// Start or resume playback of the current track
    pub async fn play(&mut self) -> Result<()> {
        if self.state == PlaybackState::Playing {
            return Ok(());
        }
        self.resume_on_focus_gain = false;
        self.resumed_from_playing = false;

        let current = self.current_id();
        if self.state == PlaybackState::Paused && self.loaded.is_some() && self.loaded == current {
            self.acquire_focus().await?;
            self.start_output().await?;
            self.persist().await;
            return Ok(());
        }

        let Some(first) = self.queue.current().await else {
            return self.exhausted().await;
        };
        let first_id = first.id.clone();
        let Walk::Playable(track) = self.find_playable(first, Step::Forward, None).await else {
            return self.exhausted().await;
        };

        // Resume where a stop left off when it is still the same track
        let start_ms = if track.id == first_id { self.position_ms } else { 0 };

        self.acquire_focus().await?;
        self.load_track(&track, start_ms).await?;
        self.start_output().await?;
        self.persist().await;
        Ok(())
    }

    pub async fn pause(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Ok(());
        }
        self.resume_on_focus_gain = false;
        self.pause_output(true).await;
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if self.state == PlaybackState::Stopped {
            return Ok(());
        }
        self.halt().await;
        Ok(())
    }

    pub async fn skip_next(&mut self) -> Result<()> {
        self.skip(Step::Forward).await
    }

    pub async fn skip_previous(&mut self) -> Result<()> {
        self.skip(Step::Backward).await
    }

    /// Move within the current track; clamped to its duration when known
    pub async fn seek(&mut self, position_ms: u64) -> Result<()> {
        let position_ms = match self.queue.peek_current() {
            Some(track) if track.duration_ms > 0 => position_ms.min(track.duration_ms),
            _ => position_ms,
        };

        if self.loaded.is_some() && self.state != PlaybackState::Stopped {
            self.audio.seek(position_ms)?;
        }
        self.position_ms = position_ms;
        self.persist().await;
        Ok(())
    }

    /// Play `track_id` of `playlist_id` from `start_ms`
    ///
    /// Switching playlists checkpoints the one being left first.
    pub async fn select_track(
        &mut self,
        playlist_id: PlaylistId,
        track_id: &TrackId,
        start_ms: u64,
    ) -> Result<()> {
        let track = if self.queue.playlist_id() == Some(playlist_id) {
            let Some(track) = self.queue.select(track_id).await else {
                return Err(not_in_playlist(track_id, playlist_id));
            };
            track
        } else {
            if self.queue.playlist_id().is_some() {
                self.persist().await;
            }
            let found = self
                .queue
                .switch_to_track(playlist_id, Some(track_id))
                .await?
                .filter(|t| &t.id == track_id);
            let Some(track) = found else {
                self.halt().await;
                return Err(not_in_playlist(track_id, playlist_id));
            };
            track
        };

        self.resume_on_focus_gain = false;
        self.resumed_from_playing = false;

        if !self.probe.is_reachable(&track).await {
            self.notice(Notice::TrackUnreachable {
                track_id: track.id.clone(),
            });
            self.halt().await;
            return Err(PlaybackError::TrackUnreachable(track.id));
        }

        self.acquire_focus().await?;
        self.load_track(&track, start_ms).await?;
        self.start_output().await?;
        self.persist().await;
        Ok(())
    }

    pub async fn set_shuffle(&mut self, enabled: bool) -> Result<()> {
        self.queue.set_shuffle(enabled).await;
        self.pending_events
            .push(PlaybackEvent::ShuffleChanged { enabled });
        self.persist_session().await;
        Ok(())
    }

    pub async fn set_repeat_one(&mut self, enabled: bool) -> Result<()> {
        self.repeat_one = enabled;
        self.pending_events
            .push(PlaybackEvent::RepeatOneChanged { enabled });
        self.persist_session().await;
        Ok(())
    }

    /// Reopen the session saved by a previous process
    ///
    /// Lands Paused on the checkpoint track and position without playing.
    /// Stays Stopped when nothing was saved or the track cannot be read.
    pub async fn restore(&mut self) -> Result<()> {
        if self.state != PlaybackState::Stopped {
            return Err(PlaybackError::invalid("restore needs a stopped session"));
        }

        let saved = self.sessions.load_session_state().await?;
        let Some(playlist_id) = saved.active_playlist_id else {
            tracing::debug!("No saved session to restore");
            return Ok(());
        };
        let Some(playlist) = self.playlists.get_playlist(playlist_id).await? else {
            tracing::warn!("Saved playlist {} no longer exists", playlist_id);
            return Ok(());
        };

        self.repeat_one = saved.repeat_one;
        self.queue.set_shuffle(saved.shuffle_enabled).await;

        let checkpoint = playlist.checkpoint();
        let Some(track) = self
            .queue
            .switch_to_track(playlist_id, checkpoint.track_id.as_ref())
            .await?
        else {
            return Ok(());
        };

        let start_ms = if checkpoint.track_id.as_ref() == Some(&track.id) {
            checkpoint.position_ms
        } else {
            0
        };
        self.position_ms = start_ms;

        if !self.probe.is_reachable(&track).await {
            self.notice(Notice::TrackUnreachable { track_id: track.id });
            return Ok(());
        }

        self.load_track(&track, start_ms).await?;
        self.set_state(PlaybackState::Paused);
        self.resumed_from_playing = saved.was_playing;

        tracing::info!(
            "Restored playlist {} at {} ({} ms)",
            playlist_id,
            track.id,
            start_ms
        );
        Ok(())
    }

    // ===== Queue editing =====

    /// Append tracks to the active playlist
    pub async fn append_tracks(&mut self, tracks: Vec<NewTrack>) -> Result<usize> {
        self.require_active()?;
        let before = self.current_id();
        let added = self.queue.append_tracks(tracks).await?;
        self.after_queue_edit(before).await?;
        Ok(added)
    }

    /// Move a track of the active playlist
    pub async fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        self.require_active()?;
        let before = self.current_id();
        self.queue.move_track(from, to).await?;
        self.after_queue_edit(before).await
    }

    /// Remove tracks from the active playlist
    pub async fn remove_tracks(&mut self, track_ids: &[TrackId]) -> Result<usize> {
        self.require_active()?;
        let before = self.current_id();
        let removed = self.queue.remove_tracks(track_ids).await?;
        self.after_queue_edit(before).await?;
        Ok(removed)
    }

    /// Re-read the active playlist after it was edited elsewhere
    pub async fn reconcile(&mut self, removed: &[TrackId]) -> Result<()> {
        let before = self.current_id();
        self.queue.reconcile(removed).await?;
        self.after_queue_edit(before).await
    }

    /// Delete a playlist, stopping playback first if it is the active one
    pub async fn delete_playlist(&mut self, playlist_id: PlaylistId) -> Result<bool> {
        if self.queue.playlist_id() == Some(playlist_id) {
            if self.state != PlaybackState::Stopped {
                self.notice(Notice::EmptyQueue);
                self.halt().await;
            }
            self.queue.deactivate(playlist_id);
            self.position_ms = 0;
        }

        let existed = self.playlists.delete_playlist(playlist_id).await?;
        self.persist_session().await;
        Ok(existed)
    }

    // ===== External events =====

    pub async fn handle_engine_event(&mut self, event: EngineEvent) {
        let result = match event {
            EngineEvent::TrackEnded => self.track_ended().await,
            EngineEvent::Focus(change) => self.focus_changed(change).await,
            EngineEvent::OutputDisconnected => self.output_disconnected().await,
        };

        if let Err(e) = result {
            tracing::warn!("Handling {:?} failed: {}", event, e);
        }
    }

    /// The loaded track played to its end
    pub async fn track_ended(&mut self) -> Result<()> {
        if self.state != PlaybackState::Playing {
            return Ok(());
        }

        if self.repeat_one {
            self.audio.seek(0)?;
            self.audio.play()?;
            self.position_ms = 0;
            self.persist().await;
            return Ok(());
        }

        // Read before advancing: the end of the list pauses on the wrapped track
        let was_ended = self.queue.is_ended();
        let origin = self.current_id();

        let Some(first) = self.queue.next().await else {
            return self.exhausted().await;
        };
        let Walk::Playable(track) = self
            .find_playable(first, Step::Forward, origin.as_ref())
            .await
        else {
            return self.exhausted().await;
        };

        self.load_track(&track, 0).await?;
        if was_ended {
            tracing::info!("Reached the end of the queue");
            self.enter_paused(true);
        } else {
            self.start_output().await?;
        }
        self.persist().await;
        Ok(())
    }

    pub async fn focus_changed(&mut self, change: FocusChange) -> Result<()> {
        tracing::debug!("Audio focus change: {:?}", change);

        match change {
            FocusChange::Lost => {
                self.pause().await?;
                self.release_focus();
            }
            FocusChange::LostTransient => {
                if self.state == PlaybackState::Playing {
                    self.pause_output(false).await;
                    self.resume_on_focus_gain = true;
                }
            }
            FocusChange::LostTransientCanDuck => {
                if self.state == PlaybackState::Playing {
                    self.audio.set_volume(self.config.duck_volume);
                    self.ducked = true;
                }
            }
            FocusChange::Gained => {
                self.restore_volume();
                if self.resume_on_focus_gain && self.state == PlaybackState::Paused {
                    self.resume_on_focus_gain = false;
                    return self.play().await;
                }
                self.resume_on_focus_gain = false;
            }
        }
        Ok(())
    }

    pub async fn output_disconnected(&mut self) -> Result<()> {
        tracing::info!("Audio output disconnected");
        self.pause().await
    }

    /// A timer went off; fires from cancelled timers are ignored
    pub async fn handle_timer(&mut self, fired: TimerFired) {
        let current = match fired.kind {
            TimerKind::Checkpoint => self.checkpoint_timer.as_ref(),
            TimerKind::Inactivity => self.inactivity_timer.as_ref(),
        };
        if current.map(Timer::generation) != Some(fired.generation) {
            tracing::debug!("Ignoring stale {:?} timer #{}", fired.kind, fired.generation);
            return;
        }

        match fired.kind {
            TimerKind::Checkpoint => {
                if self.state == PlaybackState::Playing {
                    self.persist().await;
                }
            }
            TimerKind::Inactivity => {
                self.inactivity_timer = None;
                if self.state == PlaybackState::Paused {
                    tracing::info!("Paused for too long, stopping");
                    self.halt().await;
                }
            }
        }
    }

    /// Save everything and release the audio side; the session is done afterwards
    pub async fn shutdown(&mut self) {
        self.checkpoint_timer = None;
        self.inactivity_timer = None;

        self.persist().await;
        self.persist_session().await;

        if self.loaded.take().is_some() {
            if let Err(e) = self.audio.stop() {
                tracing::warn!("Engine stop failed during shutdown: {}", e);
            }
        }
        self.release_focus();
        tracing::info!("Playback session shut down");
    }

    // ===== Transitions =====

    async fn skip(&mut self, step: Step) -> Result<()> {
        if self.state == PlaybackState::Stopped {
            tracing::debug!("Skip ignored while stopped");
            return Ok(());
        }

        let origin = self.current_id();
        let first = match step {
            Step::Forward => self.queue.next().await,
            Step::Backward => self.queue.previous().await,
        };
        let Some(first) = first else {
            return self.exhausted().await;
        };
        let track = match self.find_playable(first, step, origin.as_ref()).await {
            Walk::Playable(track) => track,
            Walk::Floor => return Ok(()),
            Walk::Exhausted => return self.exhausted().await,
        };

        let playing = self.state == PlaybackState::Playing;
        self.load_track(&track, 0).await?;
        if playing {
            self.start_output().await?;
        } else {
            self.restart_inactivity_timer();
        }
        self.persist().await;
        Ok(())
    }

    /// Walk from `first` until a readable track turns up
    ///
    /// Gives up after one pass over the queue, on revisiting a track, or on
    /// returning to `origin`; the cursor then goes back to where the walk
    /// began. A backward walk that reaches the first history entry returns to
    /// `origin` instead, which keeps playing. Unreadable tracks passed over on
    /// the way are reported in one notice.
    async fn find_playable(
        &mut self,
        first: Track,
        step: Step,
        origin: Option<&TrackId>,
    ) -> Walk {
        let limit = self.queue.len().max(1);
        let start = origin.cloned().unwrap_or_else(|| first.id.clone());
        let mut skipped: Vec<TrackId> = Vec::new();
        let mut candidate = first;

        loop {
            if self.probe.is_reachable(&candidate).await {
                if !skipped.is_empty() {
                    self.notice(Notice::TracksSkipped { track_ids: skipped });
                }
                return Walk::Playable(candidate);
            }

            tracing::warn!("Track unreachable: {}", candidate.id);
            skipped.push(candidate.id.clone());

            let next = if skipped.len() < limit {
                match step {
                    Step::Forward => self.queue.next().await,
                    Step::Backward => self.queue.previous().await,
                }
            } else {
                None
            };

            match (next, origin) {
                // previous() holds at the first history entry
                (Some(next), Some(origin))
                    if step == Step::Backward
                        && next.id == candidate.id
                        && *origin != candidate.id =>
                {
                    self.replay_to(origin, limit).await;
                    self.notice(Notice::TracksSkipped { track_ids: skipped });
                    return Walk::Floor;
                }
                (Some(next), _) if !skipped.contains(&next.id) && origin != Some(&next.id) => {
                    candidate = next;
                }
                _ => {
                    self.queue.select(&start).await;
                    return Walk::Exhausted;
                }
            }
        }
    }

    /// Step forward through history until `target` is current again
    async fn replay_to(&mut self, target: &TrackId, limit: usize) {
        for _ in 0..limit {
            match self.queue.next().await {
                Some(track) if &track.id == target => return,
                Some(_) => {}
                None => break,
            }
        }
        tracing::warn!("Could not return to {} after a backward skip", target);
    }

    async fn after_queue_edit(&mut self, before: Option<TrackId>) -> Result<()> {
        self.pending_events.push(PlaybackEvent::QueueChanged {
            len: self.queue.len(),
        });

        let after = self.queue.peek_current().cloned();
        if after.as_ref().map(|t| &t.id) == before.as_ref() {
            return Ok(());
        }

        if self.state == PlaybackState::Stopped {
            self.position_ms = 0;
            return Ok(());
        }

        let Some(after) = after else {
            self.exhaust().await;
            return Ok(());
        };
        let Walk::Playable(track) = self.find_playable(after, Step::Forward, None).await else {
            self.exhaust().await;
            return Ok(());
        };

        let playing = self.state == PlaybackState::Playing;
        self.load_track(&track, 0).await?;
        if playing {
            self.start_output().await?;
        }
        self.persist().await;
        Ok(())
    }

    /// Nothing playable: notify, stop, and fail the command
    async fn exhausted(&mut self) -> Result<()> {
        self.exhaust().await;
        Err(PlaybackError::EmptyQueue)
    }

    async fn exhaust(&mut self) {
        self.notice(Notice::EmptyQueue);
        if self.state != PlaybackState::Stopped {
            self.halt().await;
        }
    }

    /// Stop transition without the state check
    async fn halt(&mut self) {
        self.checkpoint_timer = None;
        self.inactivity_timer = None;

        if self.loaded.take().is_some() {
            if self.state != PlaybackState::Stopped {
                self.position_ms = self.audio.position_ms();
            }
            if let Err(e) = self.audio.pause().and_then(|()| self.audio.stop()) {
                tracing::warn!("Engine stop failed: {}", e);
            }
        }

        self.release_focus();
        self.restore_volume();
        self.resume_on_focus_gain = false;
        self.resumed_from_playing = false;
        self.set_state(PlaybackState::Stopped);
        self.persist().await;
    }

    async fn pause_output(&mut self, release_focus: bool) {
        self.checkpoint_timer = None;
        self.position_ms = self.audio.position_ms();
        if let Err(e) = self.audio.pause() {
            tracing::warn!("Engine pause failed: {}", e);
        }
        self.enter_paused(release_focus);
        self.persist().await;
    }

    fn enter_paused(&mut self, release_focus: bool) {
        self.checkpoint_timer = None;
        if release_focus {
            self.release_focus();
        }
        self.set_state(PlaybackState::Paused);
        self.restart_inactivity_timer();
    }

    /// Start the engine and enter Playing
    async fn start_output(&mut self) -> Result<()> {
        if let Err(e) = self.audio.play() {
            self.halt().await;
            return Err(e);
        }

        self.inactivity_timer = None;
        self.set_state(PlaybackState::Playing);
        self.start_checkpoint_timer();
        Ok(())
    }

    async fn load_track(&mut self, track: &Track, start_ms: u64) -> Result<()> {
        let loaded = match self.audio.load(track).await {
            Ok(()) if start_ms > 0 => self.audio.seek(start_ms),
            other => other,
        };

        if let Err(e) = loaded {
            tracing::error!("Failed to load {}: {}", track.id, e);
            self.halt().await;
            return Err(e);
        }

        tracing::debug!("Loaded {} at {} ms", track.id, start_ms);
        self.loaded = Some(track.id.clone());
        self.position_ms = start_ms;
        Ok(())
    }

    async fn acquire_focus(&mut self) -> Result<()> {
        if self.has_focus {
            return Ok(());
        }

        match self.focus.request() {
            FocusRequest::Granted => {
                self.has_focus = true;
                Ok(())
            }
            FocusRequest::Denied => {
                tracing::warn!("Audio focus denied");
                self.halt().await;
                Err(PlaybackError::FocusDenied)
            }
        }
    }

    fn release_focus(&mut self) {
        if self.has_focus {
            self.focus.abandon();
            self.has_focus = false;
        }
    }

    fn restore_volume(&mut self) {
        if self.ducked {
            self.audio.set_volume(1.0);
            self.ducked = false;
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state != state {
            tracing::info!("Playback {:?} -> {:?}", self.state, state);
            self.state = state;
            self.pending_events
                .push(PlaybackEvent::StateChanged { state });
        }
    }

    fn notice(&mut self, notice: Notice) {
        tracing::warn!("Notice: {:?}", notice);
        self.pending_events.push(PlaybackEvent::Notice(notice));
    }

    fn current_id(&self) -> Option<TrackId> {
        self.queue.peek_current().map(|t| t.id.clone())
    }

    fn require_active(&self) -> Result<()> {
        if self.queue.playlist_id().is_none() {
            return Err(PlaybackError::invalid("no active playlist"));
        }
        Ok(())
    }

    // ===== Timers =====

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn start_checkpoint_timer(&mut self) {
        let generation = self.next_generation();
        self.checkpoint_timer = Some(Timer::periodic(
            TimerKind::Checkpoint,
            generation,
            self.config.checkpoint_interval(),
            self.timer_tx.clone(),
        ));
    }

    fn restart_inactivity_timer(&mut self) {
        let generation = self.next_generation();
        self.inactivity_timer = Some(Timer::once(
            TimerKind::Inactivity,
            generation,
            self.config.inactivity_timeout(),
            self.timer_tx.clone(),
        ));
    }

    // ===== Persistence =====

    fn session_state(&self) -> SessionState {
        SessionState {
            active_playlist_id: self.queue.playlist_id(),
            shuffle_enabled: self.queue.shuffle_enabled(),
            repeat_one: self.repeat_one,
            was_playing: self.state == PlaybackState::Playing,
        }
    }

    /// Write the resume checkpoint and session state
    ///
    /// Failures are logged; the next persistence point writes the latest
    /// state again.
    async fn persist(&mut self) {
        self.position_ms = self.position_ms();

        if let Some(playlist_id) = self.queue.playlist_id() {
            let checkpoint = Checkpoint {
                playlist_id,
                track_id: self.current_id(),
                position_ms: if self.current_id().is_some() { self.position_ms } else { 0 },
            };

            let result = self
                .playlists
                .save_checkpoint(&checkpoint)
                .await
                .map_err(|e| PlaybackError::Persistence(e.to_string()));
            self.record_persistence(result);
        }

        self.persist_session().await;
        self.queue.flush().await;
    }

    async fn persist_session(&mut self) {
        let state = self.session_state();
        let result = self
            .sessions
            .save_session_state(&state)
            .await
            .map_err(|e| PlaybackError::Persistence(e.to_string()));
        self.record_persistence(result);
    }

    fn record_persistence(&mut self, result: Result<()>) {
        match result {
            Ok(()) => {
                if self.persistence_failed {
                    tracing::info!("Persistence recovered");
                }
                self.persistence_failed = false;
            }
            Err(e) => {
                tracing::warn!("{}; will retry at the next checkpoint", e);
                self.persistence_failed = true;
            }
        }
    }
}

fn not_in_playlist(track_id: &TrackId, playlist_id: PlaylistId) -> PlaybackError {
    PlaybackError::invalid(format!(
        "track {} is not in playlist {}",
        track_id, playlist_id
    ))
}
