/// Reprise - local playlist player with resumable shuffle
mod config;
mod library;
mod shell;
mod simulated;

use clap::{Parser, Subcommand};
use crate::config::CliConfig;
use crate::library::Store;
use reprise_core::{MemoryStore, PlaylistId};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "reprise", version)]
#[command(about = "Local playlist player with resumable shuffle", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "REPRISE_CONFIG")]
    config: Option<PathBuf>,

    /// Database URL, overriding the configuration
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Keep everything in memory; nothing is saved
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage playlists
    Playlist {
        #[command(subcommand)]
        action: PlaylistAction,
    },
    /// List the tracks of a playlist
    Tracks {
        /// Playlist ID
        playlist: i64,
    },
    /// Append audio files to a playlist
    Add {
        /// Playlist ID
        playlist: i64,
        /// Files to add
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Start the interactive player
    Run {
        /// Length in seconds for tracks without a known duration
        #[arg(long, default_value_t = 30)]
        default_duration: u64,
    },
}

#[derive(Subcommand)]
enum PlaylistAction {
    /// Create an empty playlist
    Create {
        /// Playlist name
        name: String,
    },
    /// List all playlists
    List,
    /// Delete a playlist and its tracks
    Delete {
        /// Playlist ID
        id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref(), cli.database_url.as_deref())?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if cli.ephemeral {
        tracing::info!("Running with an in-memory store");
        dispatch(cli.command, Arc::new(MemoryStore::new()), &config).await
    } else {
        let store = reprise_storage::open(&config.database_url).await?;
        dispatch(cli.command, Arc::new(store), &config).await
    }
}

async fn dispatch<S: Store>(
    command: Commands,
    store: Arc<S>,
    config: &CliConfig,
) -> anyhow::Result<()> {
    match command {
        Commands::Playlist { action } => match action {
            PlaylistAction::Create { name } => library::create_playlist(store.as_ref(), &name).await,
            PlaylistAction::List => library::list_playlists(store.as_ref()).await,
            PlaylistAction::Delete { id } => {
                library::delete_playlist(store.as_ref(), PlaylistId::new(id)).await
            }
        },
        Commands::Tracks { playlist } => {
            library::list_tracks(store.as_ref(), PlaylistId::new(playlist)).await
        }
        Commands::Add { playlist, files } => {
            library::add_files(store.as_ref(), PlaylistId::new(playlist), &files)
                .await
                .map(drop)
        }
        Commands::Run { default_duration } => {
            shell::run(store, config, Duration::from_secs(default_duration)).await
        }
    }
}
