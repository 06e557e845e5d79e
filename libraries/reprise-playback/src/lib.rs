//! Reprise - Playback Management
//!
//! Platform-agnostic playback control for a local music player.
//!
//! This crate provides:
//! - Linear and shuffle traversal over the active playlist
//! - Shuffle history that survives restarts (stack + pool)
//! - Reconciliation of the queue with external playlist edits
//! - The playback session state machine (Stopped / Paused / Playing)
//! - Audio focus handling (pause, duck, resume)
//! - Resume checkpoints written on every transition and periodically
//! - A single-task player with a cloneable command handle
//!
//! # Architecture
//!
//! `reprise-playback` knows nothing about decoders, operating systems or
//! databases. The audio engine, the focus arbiter and the track stores are
//! provided through traits ([`AudioEngine`], [`AudioFocus`], [`TrackProbe`],
//! and the store traits of `reprise-core`).
//!
//! # Example
//!
//! ```rust,no_run
//! use reprise_core::{MemoryStore, NewTrack, PlaylistStore, TrackStore};
//! use reprise_playback::{
//!     AlwaysGranted, AudioEngine, Collaborators, FileProbe, PlaybackConfig, Player,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(audio: Arc<dyn AudioEngine>) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let playlist = store.create_playlist("Evening").await?;
//! let first = NewTrack::new("/music/a.flac", "A", "Artist").into_track(playlist.id, 0);
//! store.upsert_tracks(&[first.clone()]).await?;
//!
//! let collaborators = Collaborators::new(
//!     store,
//!     audio,
//!     Arc::new(AlwaysGranted),
//!     Arc::new(FileProbe),
//! );
//! let (player, task) = Player::spawn(PlaybackConfig::default(), collaborators);
//!
//! player.select_track(playlist.id, first.id, 0).await?;
//! player.pause().await?;
//!
//! player.shutdown();
//! task.await?;
//! # Ok(())
//! # }
//! ```

mod audio;
mod engine;
mod error;
mod events;
mod player;
pub mod queue;
mod session;
pub mod shuffle;
pub mod timers;
pub mod types;

// Public exports
pub use audio::{
    AlwaysGranted, AudioEngine, AudioFocus, EngineEvent, EngineEvents, FileProbe, FocusChange,
    FocusRequest, TrackProbe,
};
pub use engine::QueueEngine;
pub use error::{PlaybackError, Result};
pub use events::{Notice, PlaybackEvent};
pub use player::{Command, Player, PlayerHandle};
pub use queue::QueueSession;
pub use session::{Collaborators, PlaybackSession};
pub use types::{PlaybackConfig, PlaybackSnapshot, PlaybackState};
