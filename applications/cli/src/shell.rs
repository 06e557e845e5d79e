//! Interactive transport shell
//!
//! Reads one command per line from stdin and forwards it to the player task
//! while a background task prints playback events.

use crate::config::CliConfig;
use crate::library::{format_ms, Store};
use crate::simulated::SimulatedEngine;
use anyhow::Context;
use reprise_core::{PlaylistId, TrackId};
use reprise_playback::{
    AlwaysGranted, Collaborators, FileProbe, Notice, PlaybackEvent, PlaybackSnapshot, Player,
    PlayerHandle,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

const HELP: &str = "\
Commands:
  play | pause | stop | next | prev
  seek <ms>                       jump within the current track
  select <playlist> <index> [ms]  play a track by position
  shuffle on|off                  toggle shuffle traversal
  repeat on|off                   loop the current track
  remove <index>                  remove a track from the active playlist
  move <from> <to>                reorder the active playlist
  status                          show what is playing
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Play,
    Pause,
    Stop,
    Next,
    Prev,
    Seek(u64),
    Select {
        playlist: PlaylistId,
        index: usize,
        start_ms: u64,
    },
    Shuffle(bool),
    Repeat(bool),
    Remove(usize),
    Move { from: usize, to: usize },
    Status,
    Help,
    Quit,
}

/// Parse one line; `Ok(None)` for a blank line
pub fn parse(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let input = match (command, args.as_slice()) {
        ("play", []) => Input::Play,
        ("pause", []) => Input::Pause,
        ("stop", []) => Input::Stop,
        ("next", []) => Input::Next,
        ("prev" | "previous", []) => Input::Prev,
        ("seek", [ms]) => Input::Seek(number(ms)?),
        ("select", [playlist, index]) => Input::Select {
            playlist: PlaylistId::new(number(playlist)?),
            index: number(index)?,
            start_ms: 0,
        },
        ("select", [playlist, index, ms]) => Input::Select {
            playlist: PlaylistId::new(number(playlist)?),
            index: number(index)?,
            start_ms: number(ms)?,
        },
        ("shuffle", [flag]) => Input::Shuffle(switch(flag)?),
        ("repeat", [flag]) => Input::Repeat(switch(flag)?),
        ("remove", [index]) => Input::Remove(number(index)?),
        ("move", [from, to]) => Input::Move {
            from: number(from)?,
            to: number(to)?,
        },
        ("status", []) => Input::Status,
        ("help" | "?", []) => Input::Help,
        ("quit" | "exit", []) => Input::Quit,
        _ => return Err(format!("unknown command: {} (try 'help')", line.trim())),
    };
    Ok(Some(input))
}

fn number<T: std::str::FromStr>(word: &str) -> Result<T, String> {
    word.parse().map_err(|_| format!("not a number: {}", word))
}

fn switch(word: &str) -> Result<bool, String> {
    match word {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(format!("expected on or off, got {}", other)),
    }
}

/// Run the player until `quit`, end of input or Ctrl-C
pub async fn run<S: Store>(
    store: Arc<S>,
    config: &CliConfig,
    fallback_duration: Duration,
) -> anyhow::Result<()> {
    let engine = Arc::new(SimulatedEngine::new(fallback_duration));
    let collaborators = Collaborators::new(
        Arc::clone(&store),
        engine,
        Arc::new(AlwaysGranted),
        Arc::new(FileProbe),
    );
    let (player, task) = Player::spawn(config.playback.clone(), collaborators);
    let printer = tokio::spawn(print_events(player.subscribe()));

    if let Err(e) = player.restore().await {
        tracing::warn!("Could not restore the last session: {}", e);
    }
    print_status(&player.snapshot());
    println!("Type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse(&line) {
            Ok(None) => {}
            Ok(Some(Input::Quit)) => break,
            Ok(Some(input)) => {
                if let Err(e) = execute(&player, store.as_ref(), input).await {
                    println!("error: {}", e);
                }
            }
            Err(message) => println!("{}", message),
        }
    }

    player.shutdown();
    task.await.context("player task failed")?;
    printer.abort();
    Ok(())
}

async fn execute<S: Store>(player: &PlayerHandle, store: &S, input: Input) -> anyhow::Result<()> {
    match input {
        Input::Play => player.play().await?,
        Input::Pause => player.pause().await?,
        Input::Stop => player.stop().await?,
        Input::Next => player.next().await?,
        Input::Prev => player.previous().await?,
        Input::Seek(ms) => player.seek(ms).await?,
        Input::Select {
            playlist,
            index,
            start_ms,
        } => {
            let track_id = track_at(store, playlist, index).await?;
            player.select_track(playlist, track_id, start_ms).await?;
        }
        Input::Shuffle(enabled) => player.set_shuffle(enabled).await?,
        Input::Repeat(enabled) => player.set_repeat_one(enabled).await?,
        Input::Remove(index) => {
            let playlist = active_playlist(player)?;
            let track_id = track_at(store, playlist, index).await?;
            player.remove_tracks(vec![track_id]).await?;
        }
        Input::Move { from, to } => player.move_track(from, to).await?,
        Input::Status => print_status(&player.snapshot()),
        Input::Help => println!("{}", HELP),
        Input::Quit => {}
    }
    Ok(())
}

async fn track_at<S: Store>(
    store: &S,
    playlist: PlaylistId,
    index: usize,
) -> anyhow::Result<TrackId> {
    let tracks = store.list_tracks(playlist).await?;
    tracks
        .into_iter()
        .find(|t| t.position as usize == index)
        .map(|t| t.id)
        .with_context(|| format!("playlist {} has no track at {}", playlist, index))
}

fn active_playlist(player: &PlayerHandle) -> anyhow::Result<PlaylistId> {
    player
        .snapshot()
        .playlist_id
        .context("no active playlist")
}

fn print_status(snapshot: &PlaybackSnapshot) {
    let Some(track) = &snapshot.current_track else {
        println!("[{:?}] nothing queued", snapshot.state);
        return;
    };

    let mut flags = Vec::new();
    if snapshot.shuffle_enabled {
        flags.push("shuffle");
    }
    if snapshot.repeat_one {
        flags.push("repeat one");
    }
    if snapshot.resumed_from_playing {
        flags.push("was playing");
    }

    println!(
        "[{:?}] {} - {} ({} / {}){}",
        snapshot.state,
        track.artist,
        track.title,
        format_ms(snapshot.position_ms),
        format_ms(track.duration_ms),
        if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        }
    );
}

async fn print_events(mut events: broadcast::Receiver<PlaybackEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => print_event(&event),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::debug!("Event printer skipped {} events", missed);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_event(event: &PlaybackEvent) {
    match event {
        PlaybackEvent::StateChanged { state } => println!("> {:?}", state),
        PlaybackEvent::TrackChanged { track_id, .. } => println!("> now: {}", track_id),
        PlaybackEvent::PlaylistChanged {
            playlist_id: Some(id),
        } => println!("> playlist {}", id),
        PlaybackEvent::PlaylistChanged { playlist_id: None } => println!("> no playlist"),
        PlaybackEvent::ShuffleChanged { enabled } => {
            println!("> shuffle {}", if *enabled { "on" } else { "off" });
        }
        PlaybackEvent::RepeatOneChanged { enabled } => {
            println!("> repeat {}", if *enabled { "on" } else { "off" });
        }
        PlaybackEvent::QueueChanged { len } => println!("> queue has {} tracks", len),
        PlaybackEvent::Notice(Notice::EmptyQueue) => println!("! nothing left to play"),
        PlaybackEvent::Notice(Notice::TrackUnreachable { track_id }) => {
            println!("! cannot read {}", track_id);
        }
        PlaybackEvent::Notice(Notice::TracksSkipped { track_ids }) => {
            println!("! skipped {} unreadable tracks", track_ids.len());
        }
    }
}
