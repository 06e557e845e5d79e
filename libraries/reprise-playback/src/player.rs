//! Player task
//!
//! A single task owns the [`PlaybackSession`] and applies one input at a
//! time: commands from [`PlayerHandle`]s, engine and focus events, and timer
//! fires. After each input the latest [`PlaybackSnapshot`] is published on a
//! watch channel and the produced [`PlaybackEvent`]s are broadcast.

use crate::audio::{EngineEvent, EngineEvents};
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::session::{Collaborators, PlaybackSession};
use crate::timers::TimerFired;
use crate::types::{PlaybackConfig, PlaybackSnapshot};
use reprise_core::{NewTrack, PlaylistId, TrackId};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Timer fires waiting to be handled
const TIMER_BUFFER: usize = 8;

/// Commands accepted by the player
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start or resume playback
    Play,

    /// Pause playback
    Pause,

    /// Stop playback
    Stop,

    /// Skip to next track
    Next,

    /// Go to previous track
    Previous,

    /// Seek to position (in milliseconds)
    Seek(u64),

    /// Play a specific track, switching playlists if needed
    SelectTrack {
        playlist_id: PlaylistId,
        track_id: TrackId,
        start_ms: u64,
    },

    SetShuffle(bool),

    SetRepeatOne(bool),

    /// Reopen the previously saved session
    Restore,

    /// Append tracks to the active playlist
    AppendTracks(Vec<NewTrack>),

    /// Move a track of the active playlist
    MoveTrack { from: usize, to: usize },

    /// Remove tracks from the active playlist
    RemoveTracks(Vec<TrackId>),

    /// The active playlist was edited elsewhere
    Reconcile { removed: Vec<TrackId> },

    DeletePlaylist(PlaylistId),
}

#[derive(Debug)]
enum Outcome {
    Done,
    Count(usize),
    Deleted(bool),
}

struct Request {
    command: Command,
    reply: oneshot::Sender<Result<Outcome>>,
}

/// The task that owns the playback session
pub struct Player {
    session: PlaybackSession,
    commands: mpsc::Receiver<Request>,
    engine_rx: mpsc::UnboundedReceiver<EngineEvent>,
    timer_rx: mpsc::Receiver<TimerFired>,
    snapshot_tx: watch::Sender<PlaybackSnapshot>,
    events_tx: broadcast::Sender<PlaybackEvent>,
    shutdown: CancellationToken,
}

impl Player {
    /// Start the player task
    ///
    /// The audio engine and focus arbiter are attached to the player's event
    /// channel here. The task saves the session and exits after
    /// [`PlayerHandle::shutdown`] or once every handle is dropped.
    pub fn spawn(
        config: PlaybackConfig,
        collaborators: Collaborators,
    ) -> (PlayerHandle, JoinHandle<()>) {
        let (engine_events, engine_rx) = EngineEvents::channel();
        collaborators.audio.attach(engine_events.clone());
        collaborators.focus.attach(engine_events);

        let (timer_tx, timer_rx) = mpsc::channel(TIMER_BUFFER);
        let (command_tx, commands) = mpsc::channel(config.command_buffer.max(1));
        let (events_tx, _) = broadcast::channel(config.event_buffer.max(1));

        let session = PlaybackSession::new(config, collaborators, timer_tx);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());
        let shutdown = CancellationToken::new();

        let player = Self {
            session,
            commands,
            engine_rx,
            timer_rx,
            snapshot_tx,
            events_tx: events_tx.clone(),
            shutdown: shutdown.clone(),
        };
        let task = tokio::spawn(player.run());

        let handle = PlayerHandle {
            commands: command_tx,
            snapshot: snapshot_rx,
            events: events_tx,
            shutdown,
        };
        (handle, task)
    }

    async fn run(mut self) {
        tracing::info!("Player started");

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                Some(event) = self.engine_rx.recv() => {
                    self.session.handle_engine_event(event).await;
                }
                Some(fired) = self.timer_rx.recv() => {
                    self.session.handle_timer(fired).await;
                }
                request = self.commands.recv() => match request {
                    Some(request) => self.handle(request).await,
                    None => break,
                },
            }
            self.publish();
        }

        self.session.shutdown().await;
        self.publish();
        tracing::info!("Player stopped");
    }

    async fn handle(&mut self, request: Request) {
        let Request { command, reply } = request;
        tracing::debug!("Command: {:?}", command);

        let result = self.execute(command).await;
        if let Err(e) = &result {
            tracing::warn!("Command failed: {}", e);
        }

        // Callers see the snapshot of their own command
        self.publish();

        // The caller may have given up waiting
        let _ = reply.send(result);
    }

    async fn execute(&mut self, command: Command) -> Result<Outcome> {
        let session = &mut self.session;
        match command {
            Command::Play => session.play().await.map(|()| Outcome::Done),
            Command::Pause => session.pause().await.map(|()| Outcome::Done),
            Command::Stop => session.stop().await.map(|()| Outcome::Done),
            Command::Next => session.skip_next().await.map(|()| Outcome::Done),
            Command::Previous => session.skip_previous().await.map(|()| Outcome::Done),
            Command::Seek(position_ms) => session.seek(position_ms).await.map(|()| Outcome::Done),
            Command::SelectTrack {
                playlist_id,
                track_id,
                start_ms,
            } => session
                .select_track(playlist_id, &track_id, start_ms)
                .await
                .map(|()| Outcome::Done),
            Command::SetShuffle(enabled) => {
                session.set_shuffle(enabled).await.map(|()| Outcome::Done)
            }
            Command::SetRepeatOne(enabled) => {
                session.set_repeat_one(enabled).await.map(|()| Outcome::Done)
            }
            Command::Restore => session.restore().await.map(|()| Outcome::Done),
            Command::AppendTracks(tracks) => session.append_tracks(tracks).await.map(Outcome::Count),
            Command::MoveTrack { from, to } => {
                session.move_track(from, to).await.map(|()| Outcome::Done)
            }
            Command::RemoveTracks(track_ids) => {
                session.remove_tracks(&track_ids).await.map(Outcome::Count)
            }
            Command::Reconcile { removed } => {
                session.reconcile(&removed).await.map(|()| Outcome::Done)
            }
            Command::DeletePlaylist(playlist_id) => session
                .delete_playlist(playlist_id)
                .await
                .map(Outcome::Deleted),
        }
    }

    fn publish(&mut self) {
        for event in self.session.take_events() {
            // No subscribers is fine
            let _ = self.events_tx.send(event);
        }
        self.snapshot_tx.send_replace(self.session.snapshot());
    }
}

/// Cloneable handle for talking to the player task
#[derive(Clone)]
pub struct PlayerHandle {
    commands: mpsc::Sender<Request>,
    snapshot: watch::Receiver<PlaybackSnapshot>,
    events: broadcast::Sender<PlaybackEvent>,
    shutdown: CancellationToken,
}

impl PlayerHandle {
    /// Send a command and wait for it to be applied
    pub async fn send(&self, command: Command) -> Result<()> {
        self.request(command).await.map(drop)
    }

    pub async fn play(&self) -> Result<()> {
        self.send(Command::Play).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.send(Command::Pause).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(Command::Stop).await
    }

    pub async fn next(&self) -> Result<()> {
        self.send(Command::Next).await
    }

    pub async fn previous(&self) -> Result<()> {
        self.send(Command::Previous).await
    }

    pub async fn seek(&self, position_ms: u64) -> Result<()> {
        self.send(Command::Seek(position_ms)).await
    }

    pub async fn select_track(
        &self,
        playlist_id: PlaylistId,
        track_id: TrackId,
        start_ms: u64,
    ) -> Result<()> {
        self.send(Command::SelectTrack {
            playlist_id,
            track_id,
            start_ms,
        })
        .await
    }

    pub async fn set_shuffle(&self, enabled: bool) -> Result<()> {
        self.send(Command::SetShuffle(enabled)).await
    }

    pub async fn set_repeat_one(&self, enabled: bool) -> Result<()> {
        self.send(Command::SetRepeatOne(enabled)).await
    }

    pub async fn restore(&self) -> Result<()> {
        self.send(Command::Restore).await
    }

    /// Returns the number of tracks added
    pub async fn append_tracks(&self, tracks: Vec<NewTrack>) -> Result<usize> {
        match self.request(Command::AppendTracks(tracks)).await? {
            Outcome::Count(added) => Ok(added),
            other => Err(unexpected(other)),
        }
    }

    pub async fn move_track(&self, from: usize, to: usize) -> Result<()> {
        self.send(Command::MoveTrack { from, to }).await
    }

    /// Returns the number of tracks removed
    pub async fn remove_tracks(&self, track_ids: Vec<TrackId>) -> Result<usize> {
        match self.request(Command::RemoveTracks(track_ids)).await? {
            Outcome::Count(removed) => Ok(removed),
            other => Err(unexpected(other)),
        }
    }

    pub async fn reconcile(&self, removed: Vec<TrackId>) -> Result<()> {
        self.send(Command::Reconcile { removed }).await
    }

    /// Returns `false` if the playlist did not exist
    pub async fn delete_playlist(&self, playlist_id: PlaylistId) -> Result<bool> {
        match self.request(Command::DeletePlaylist(playlist_id)).await? {
            Outcome::Deleted(existed) => Ok(existed),
            other => Err(unexpected(other)),
        }
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch snapshots as they are published
    pub fn watch(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshot.clone()
    }

    /// Receive events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Ask the player to save its state and exit
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn request(&self, command: Command) -> Result<Outcome> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Request { command, reply })
            .await
            .map_err(|_| PlaybackError::PlayerClosed)?;
        rx.await.map_err(|_| PlaybackError::PlayerClosed)?
    }
}

fn unexpected(outcome: Outcome) -> PlaybackError {
    PlaybackError::invalid(format!("unexpected reply {:?}", outcome))
}
