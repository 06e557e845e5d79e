//! Singleton session row restored at startup

use reprise_core::{error::Result, PlaylistId, SessionState};
use sqlx::{Row, SqlitePool};

/// Load the session state
///
/// Returns the default state if none was saved yet
pub async fn get(pool: &SqlitePool) -> Result<SessionState> {
    let row = sqlx::query(
        "SELECT active_playlist_id, shuffle_enabled, repeat_one, was_playing
         FROM session_state WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(SessionState::default());
    };

    Ok(SessionState {
        active_playlist_id: row.try_get::<Option<PlaylistId>, _>("active_playlist_id")?,
        shuffle_enabled: row.try_get::<i64, _>("shuffle_enabled")? != 0,
        repeat_one: row.try_get::<i64, _>("repeat_one")? != 0,
        was_playing: row.try_get::<i64, _>("was_playing")? != 0,
    })
}

/// Create or replace the session state
pub async fn upsert(pool: &SqlitePool, state: &SessionState) -> Result<()> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO session_state
         (id, active_playlist_id, shuffle_enabled, repeat_one, was_playing, updated_at)
         VALUES (1, ?, ?, ?, ?, ?)
         ON CONFLICT(id)
         DO UPDATE SET
            active_playlist_id = excluded.active_playlist_id,
            shuffle_enabled = excluded.shuffle_enabled,
            repeat_one = excluded.repeat_one,
            was_playing = excluded.was_playing,
            updated_at = excluded.updated_at",
    )
    .bind(state.active_playlist_id)
    .bind(i64::from(state.shuffle_enabled))
    .bind(i64::from(state.repeat_one))
    .bind(i64::from(state.was_playing))
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}
