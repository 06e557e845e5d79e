/// CLI configuration
use anyhow::Context;
use reprise_playback::PlaybackConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read from the working directory when `--config` is not given
const DEFAULT_CONFIG_FILE: &str = "reprise.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Tracing filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            log_filter: default_log_filter(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file, environment and flags, in rising priority
    ///
    /// `path` must exist when given; the default `reprise.toml` is optional.
    /// Environment variables use the `REPRISE_` prefix and `__` for nesting,
    /// e.g. `REPRISE_PLAYBACK__SHUFFLE=true`.
    pub fn load(path: Option<&Path>, database_url: Option<&str>) -> anyhow::Result<Self> {
        let mut settings = config::Config::builder();

        settings = match path {
            Some(path) => settings.add_source(config::File::from(path.to_path_buf())),
            None => settings
                .add_source(config::File::from(PathBuf::from(DEFAULT_CONFIG_FILE)).required(false)),
        };

        settings = settings.add_source(
            config::Environment::with_prefix("REPRISE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        settings = settings
            .set_override_option("database_url", database_url.map(str::to_string))
            .context("invalid --database-url")?;

        let config = settings.build().context("failed to read configuration")?;
        config
            .try_deserialize()
            .context("invalid configuration")
    }
}

// Default values
fn default_database_url() -> String {
    "sqlite://reprise.db".to_string()
}

fn default_log_filter() -> String {
    "reprise=info".to_string()
}
