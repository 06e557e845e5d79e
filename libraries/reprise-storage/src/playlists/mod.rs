use reprise_core::{error::Result, Checkpoint, CoreError, Playlist, PlaylistId, TrackId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

fn from_row(row: &SqliteRow) -> Result<Playlist> {
    let position_ms: i64 = row.try_get("last_played_position_ms")?;

    Ok(Playlist {
        id: row.try_get::<PlaylistId, _>("id")?,
        name: row.try_get("name")?,
        last_played_track_id: row.try_get::<Option<TrackId>, _>("last_played_track_id")?,
        last_played_position_ms: u64::try_from(position_ms).unwrap_or_default(),
    })
}

/// Create an empty playlist
pub async fn create(pool: &SqlitePool, name: &str) -> Result<Playlist> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::invalid_input("playlist name must not be empty"));
    }

    let now = chrono::Utc::now().timestamp();
    let result = sqlx::query("INSERT INTO playlists (name, created_at) VALUES (?, ?)")
        .bind(name)
        .bind(now)
        .execute(pool)
        .await?;

    Ok(Playlist {
        id: PlaylistId::new(result.last_insert_rowid()),
        name: name.to_string(),
        last_played_track_id: None,
        last_played_position_ms: 0,
    })
}

/// All playlists, oldest first
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Playlist>> {
    let rows = sqlx::query(
        "SELECT id, name, last_played_track_id, last_played_position_ms
         FROM playlists ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(from_row).collect()
}

/// Playlist by ID
pub async fn get_by_id(pool: &SqlitePool, id: PlaylistId) -> Result<Option<Playlist>> {
    let row = sqlx::query(
        "SELECT id, name, last_played_track_id, last_played_position_ms
         FROM playlists WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(from_row).transpose()
}

/// Write a playlist's resume checkpoint
pub async fn save_checkpoint(pool: &SqlitePool, checkpoint: &Checkpoint) -> Result<()> {
    let result = sqlx::query(
        "UPDATE playlists
         SET last_played_track_id = ?, last_played_position_ms = ?
         WHERE id = ?",
    )
    .bind(checkpoint.track_id.as_ref())
    .bind(i64::try_from(checkpoint.position_ms).unwrap_or(i64::MAX))
    .bind(checkpoint.playlist_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::PlaylistNotFound(checkpoint.playlist_id));
    }

    Ok(())
}

/// Delete a playlist; its tracks go with it through the foreign key cascade
///
/// Returns `false` if no playlist had that ID.
pub async fn delete(pool: &SqlitePool, id: PlaylistId) -> Result<bool> {
    let result = sqlx::query("DELETE FROM playlists WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
