//! Reprise Core
//!
//! Platform-agnostic core types, store traits, and error handling for Reprise.
//!
//! This crate provides the foundational building blocks shared by the storage
//! layer, the playback engine and the front-ends.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Track`, `Playlist`, `Checkpoint`, `SessionState`
//! - **Store Traits**: `TrackStore`, `PlaylistStore`, `SessionStore`
//! - **Error Handling**: Unified `CoreError` and `Result` types
//! - **MemoryStore**: an in-process implementation of every store trait
//!
//! # Example
//!
//! ```rust
//! use reprise_core::{MemoryStore, NewTrack, PlaylistStore, TrackStore};
//!
//! # async fn example() -> reprise_core::Result<()> {
//! let store = MemoryStore::new();
//! let playlist = store.create_playlist("Road Trip").await?;
//!
//! let tracks = vec![
//!     NewTrack::new("/music/a.flac", "Song A", "Artist").into_track(playlist.id, 0),
//!     NewTrack::new("/music/b.flac", "Song B", "Artist").into_track(playlist.id, 1),
//! ];
//! store.upsert_tracks(&tracks).await?;
//!
//! assert_eq!(store.list_tracks(playlist.id).await?.len(), 2);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use memory::MemoryStore;
pub use traits::{PlaylistStore, SessionStore, TrackStore};

pub use types::{
    Checkpoint, NewTrack, Playlist, PlaylistId, SessionState, Track, TrackId, NO_STACK_SLOT,
};
