//! Reprise Storage
//!
//! `SQLite` persistence for playlists, their tracks, and the playback session.
//!
//! # Architecture
//!
//! - **Vertical Slicing**: each table owns its own queries (`tracks`, `playlists`, `session_state`)
//! - **Context object**: [`SqliteStore`] implements the `reprise-core` store traits by
//!   delegating to the slices
//! - **Embedded migrations**: the schema ships inside the binary
//!
//! # Example
//!
//! ```rust,no_run
//! use reprise_storage::{create_pool, run_migrations, SqliteStore};
//! use reprise_core::PlaylistStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool("sqlite://reprise.db").await?;
//! run_migrations(&pool).await?;
//!
//! let store = SqliteStore::new(pool);
//! let playlists = store.list_playlists().await?;
//! # Ok(())
//! # }
//! ```

mod context;
mod error;

// Vertical slices
pub mod playlists;
pub mod session_state;
pub mod tracks;

pub use context::SqliteStore;
pub use error::StorageError;

use sqlx::migrate::Migrator;
use sqlx::sqlite::SqlitePool;

// Embed migrations into binary
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
///
/// This should be called once when the application starts to ensure
/// the database schema is up to date.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Create a new `SQLite` pool
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (e.g., `<sqlite://reprise.db>`)
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
    use std::str::FromStr;

    tracing::debug!("Creating pool with URL: {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    tracing::debug!("Pool created");

    Ok(pool)
}

/// Open (creating if needed) a database, migrate it, and wrap it in a [`SqliteStore`]
pub async fn open(database_url: &str) -> Result<SqliteStore, StorageError> {
    let pool = create_pool(database_url)
        .await
        .map_err(|e| StorageError::Connection(format!("{database_url}: {e}")))?;
    run_migrations(&pool).await?;
    tracing::info!("Database ready at {}", database_url);
    Ok(SqliteStore::new(pool))
}
