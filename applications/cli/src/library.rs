//! Playlist editing subcommands
//!
//! These work on the store directly; no player is running.

use anyhow::{bail, Context};
use reprise_core::{NewTrack, PlaylistId, PlaylistStore, SessionStore, Track, TrackStore};
use std::path::{Path, PathBuf};

/// Every store the CLI can run against
pub trait Store: TrackStore + PlaylistStore + SessionStore + 'static {}

impl<S> Store for S where S: TrackStore + PlaylistStore + SessionStore + 'static {}

pub async fn create_playlist<S: Store>(store: &S, name: &str) -> anyhow::Result<()> {
    let playlist = store.create_playlist(name).await?;
    println!("Created playlist {}: {}", playlist.id, playlist.name);
    Ok(())
}

pub async fn list_playlists<S: Store>(store: &S) -> anyhow::Result<()> {
    let playlists = store.list_playlists().await?;
    if playlists.is_empty() {
        println!("No playlists");
        return Ok(());
    }

    let active = store.load_session_state().await?.active_playlist_id;
    for playlist in playlists {
        let count = store.list_tracks(playlist.id).await?.len();
        let marker = if active == Some(playlist.id) { "*" } else { " " };
        print!("{} {:>4}  {} ({} tracks)", marker, playlist.id, playlist.name, count);
        if let Some(track_id) = &playlist.last_played_track_id {
            print!(
                "  resume at {} {}",
                format_ms(playlist.last_played_position_ms),
                track_id
            );
        }
        println!();
    }
    Ok(())
}

pub async fn delete_playlist<S: Store>(store: &S, id: PlaylistId) -> anyhow::Result<()> {
    if store.delete_playlist(id).await? {
        println!("Deleted playlist {}", id);
    } else {
        println!("No playlist {}", id);
    }
    Ok(())
}

pub async fn list_tracks<S: Store>(store: &S, id: PlaylistId) -> anyhow::Result<()> {
    require_playlist(store, id).await?;

    let tracks = store.list_tracks(id).await?;
    if tracks.is_empty() {
        println!("Playlist {} is empty", id);
        return Ok(());
    }

    println!("{:>4} {:>5}  {:<40} {}", "pos", "slot", "title", "artist");
    for track in &tracks {
        let slot = track
            .position_in_stack
            .map_or_else(|| "-".to_string(), |slot| slot.to_string());
        println!(
            "{:>4} {:>5}  {:<40} {}",
            track.position, slot, track.title, track.artist
        );
    }
    Ok(())
}

/// Append files to a playlist; files already in it are skipped
pub async fn add_files<S: Store>(
    store: &S,
    id: PlaylistId,
    files: &[PathBuf],
) -> anyhow::Result<usize> {
    require_playlist(store, id).await?;

    let existing = store.list_tracks(id).await?;
    let mut next_position = existing.len() as u32;
    let mut rows: Vec<Track> = Vec::new();

    for file in files {
        let path = tokio::fs::canonicalize(file)
            .await
            .with_context(|| format!("cannot read {}", file.display()))?;
        let new_track = new_track_for(&path);

        let known = existing.iter().chain(&rows).any(|t| t.id == new_track.id);
        if known {
            tracing::info!("Already in playlist {}: {}", id, path.display());
            continue;
        }

        rows.push(new_track.into_track(id, next_position));
        next_position += 1;
    }

    store.upsert_tracks(&rows).await?;
    println!("Added {} tracks to playlist {}", rows.len(), id);
    Ok(rows.len())
}

/// Track for a local file: the file stem as title, artist unknown
pub fn new_track_for(path: &Path) -> NewTrack {
    let title = path
        .file_stem()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
    NewTrack::new(path.display().to_string(), title, "Unknown")
}

async fn require_playlist<S: Store>(store: &S, id: PlaylistId) -> anyhow::Result<()> {
    if store.get_playlist(id).await?.is_none() {
        bail!("no playlist with id {}", id);
    }
    Ok(())
}

/// `m:ss`
pub fn format_ms(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
