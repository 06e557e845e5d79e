//! Playlist track rows
//!
//! A row is keyed by `(track_id, playlist_id)`. `position_in_stack` is stored
//! as `-1` for tracks outside the shuffle history.

use reprise_core::{error::Result, Track, TrackId, PlaylistId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const SELECT_COLUMNS: &str = "SELECT track_id, playlist_id, position, title, artist, duration_ms, position_in_stack
     FROM tracks";

fn from_row(row: &SqliteRow) -> Result<Track> {
    let position: i64 = row.try_get("position")?;
    let duration_ms: i64 = row.try_get("duration_ms")?;
    let stack: i64 = row.try_get("position_in_stack")?;

    Ok(Track {
        id: row.try_get::<TrackId, _>("track_id")?,
        playlist_id: row.try_get::<PlaylistId, _>("playlist_id")?,
        position: u32::try_from(position).unwrap_or_default(),
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        duration_ms: u64::try_from(duration_ms).unwrap_or_default(),
        position_in_stack: Track::stack_slot_from_column(stack),
    })
}

fn collect(rows: &[SqliteRow]) -> Result<Vec<Track>> {
    rows.iter().map(from_row).collect()
}

/// Every track row across all playlists
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Track>> {
    let sql = format!("{SELECT_COLUMNS} ORDER BY playlist_id, position");
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    collect(&rows)
}

/// Tracks of a playlist in playlist order
pub async fn get_by_playlist(pool: &SqlitePool, playlist_id: PlaylistId) -> Result<Vec<Track>> {
    let sql = format!("{SELECT_COLUMNS} WHERE playlist_id = ? ORDER BY position");
    let rows = sqlx::query(&sql)
        .bind(playlist_id)
        .fetch_all(pool)
        .await?;
    collect(&rows)
}

/// Tracks that hold a stack slot, bottom of the stack first
pub async fn get_shuffle_history(
    pool: &SqlitePool,
    playlist_id: PlaylistId,
) -> Result<Vec<Track>> {
    let sql = format!(
        "{SELECT_COLUMNS} WHERE playlist_id = ? AND position_in_stack >= 0 ORDER BY position_in_stack"
    );
    let rows = sqlx::query(&sql)
        .bind(playlist_id)
        .fetch_all(pool)
        .await?;
    collect(&rows)
}

const UPSERT_SQL: &str = "INSERT INTO tracks
     (track_id, playlist_id, position, title, artist, duration_ms, position_in_stack)
     VALUES (?, ?, ?, ?, ?, ?, ?)
     ON CONFLICT(track_id, playlist_id)
     DO UPDATE SET
        position = excluded.position,
        title = excluded.title,
        artist = excluded.artist,
        duration_ms = excluded.duration_ms,
        position_in_stack = excluded.position_in_stack";

fn upsert_query(track: &Track) -> sqlx::query::Query<'_, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'_>> {
    sqlx::query(UPSERT_SQL)
        .bind(&track.id)
        .bind(track.playlist_id)
        .bind(i64::from(track.position))
        .bind(&track.title)
        .bind(&track.artist)
        .bind(i64::try_from(track.duration_ms).unwrap_or(i64::MAX))
        .bind(track.stack_slot_column())
}

/// Insert or replace one row
pub async fn upsert(pool: &SqlitePool, track: &Track) -> Result<()> {
    upsert_query(track).execute(pool).await?;
    Ok(())
}

/// Insert or replace many rows in one transaction
pub async fn upsert_many(pool: &SqlitePool, tracks: &[Track]) -> Result<()> {
    let mut tx = pool.begin().await?;

    for track in tracks {
        upsert_query(track).execute(&mut *tx).await?;
    }

    tx.commit().await?;

    tracing::debug!("Upserted {} track rows", tracks.len());
    Ok(())
}

/// Move a row to a new playlist position
pub async fn update_position(
    pool: &SqlitePool,
    track_id: &TrackId,
    playlist_id: PlaylistId,
    position: u32,
) -> Result<()> {
    sqlx::query("UPDATE tracks SET position = ? WHERE track_id = ? AND playlist_id = ?")
        .bind(i64::from(position))
        .bind(track_id)
        .bind(playlist_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Assign or clear a row's stack slot
pub async fn update_stack_position(
    pool: &SqlitePool,
    track_id: &TrackId,
    playlist_id: PlaylistId,
    slot: Option<u32>,
) -> Result<()> {
    let column = slot.map_or(reprise_core::NO_STACK_SLOT, i64::from);

    sqlx::query("UPDATE tracks SET position_in_stack = ? WHERE track_id = ? AND playlist_id = ?")
        .bind(column)
        .bind(track_id)
        .bind(playlist_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Clear every stack slot of a playlist
pub async fn clear_stack_positions(pool: &SqlitePool, playlist_id: PlaylistId) -> Result<()> {
    sqlx::query("UPDATE tracks SET position_in_stack = ? WHERE playlist_id = ?")
        .bind(reprise_core::NO_STACK_SLOT)
        .bind(playlist_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete rows matched by `(track_id, playlist_id)` in one transaction
pub async fn delete_many(pool: &SqlitePool, tracks: &[Track]) -> Result<()> {
    let mut tx = pool.begin().await?;

    for track in tracks {
        sqlx::query("DELETE FROM tracks WHERE track_id = ? AND playlist_id = ?")
            .bind(&track.id)
            .bind(track.playlist_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    tracing::debug!("Deleted {} track rows", tracks.len());
    Ok(())
}
