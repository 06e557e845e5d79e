//! Error types for playback management

use reprise_core::{CoreError, TrackId};
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Nothing playable in the active queue
    #[error("Queue is empty")]
    EmptyQueue,

    /// The file behind a track is missing or unreadable
    #[error("Track unreachable: {0}")]
    TrackUnreachable(TrackId),

    /// Audio focus request was refused
    #[error("Audio focus denied")]
    FocusDenied,

    /// A checkpoint or session write failed
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Audio engine error
    #[error("Audio engine error: {0}")]
    Audio(String),

    /// Store error while reloading the queue
    #[error(transparent)]
    Store(#[from] CoreError),

    /// Invalid operation
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The player task has shut down
    #[error("Player is not running")]
    PlayerClosed,
}

impl PlaybackError {
    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
