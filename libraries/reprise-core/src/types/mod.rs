mod ids;
mod playlist;
mod session_state;
mod track;

pub use ids::{PlaylistId, TrackId};
pub use playlist::{Checkpoint, Playlist};
pub use session_state::SessionState;
pub use track::{NewTrack, Track, NO_STACK_SLOT};
