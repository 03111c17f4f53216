//! Configuration file support for issuesync.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `ISSUESYNC_`, sections separated
//!    by a double underscore, e.g. `ISSUESYNC_RETRY__MAX_ATTEMPTS`)
//! 3. Config file (`./issuesync.toml`, then `~/.config/issuesync/config.toml`)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/issuesync/issuesync.db`
//! on Linux (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite:///var/lib/issuesync/issuesync.db?mode=rwc"
//!
//! [http]
//! timeout_secs = 30
//! rate_limit = true
//!
//! [retry]
//! base_delay_secs = 60
//! max_attempts = 5
//! max_delay_secs = 600
//! jitter_secs = 10
//!
//! [sync]
//! page_size = 100
//! include_closed = false
//! user_id = "00000000-0000-0000-0000-000000000000"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use issuesync::RetryConfig;
use issuesync::sync::DEFAULT_PAGE_SIZE;
use serde::Deserialize;
use uuid::Uuid;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub http: HttpConfig,
    /// Rate-limit retry schedule.
    pub retry: RetrySettings,
    /// Defaults for `issuesync sync`.
    pub sync: SyncSettings,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// Outbound HTTP settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Pace requests at each provider's default rate.
    pub rate_limit: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            rate_limit: true,
        }
    }
}

/// Retry schedule in whole seconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub base_delay_secs: u64,
    /// Total attempts, the first call included.
    pub max_attempts: u32,
    pub max_delay_secs: u64,
    pub jitter_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            base_delay_secs: defaults.base_delay.as_secs(),
            max_attempts: defaults.max_attempts,
            max_delay_secs: defaults.max_delay.as_secs(),
            jitter_secs: defaults.jitter.as_secs(),
        }
    }
}

impl RetrySettings {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::new(
            Duration::from_secs(self.base_delay_secs),
            self.max_attempts.max(1),
            Duration::from_secs(self.max_delay_secs),
        )
        .with_jitter(Duration::from_secs(self.jitter_secs))
    }
}

/// Default sync options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub page_size: u32,
    pub include_closed: bool,
    /// Recorded as reporter of imported issues and creator of connections.
    pub user_id: Option<Uuid>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            include_closed: false,
            user_id: None,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/issuesync/config.toml)
    /// 3. Local config file (./issuesync.toml)
    /// 4. Environment variables with ISSUESYNC_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("issuesync.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./issuesync.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // ISSUESYNC_DATABASE__URL -> database.url
        builder = builder.add_source(
            Environment::with_prefix("ISSUESYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// `mode=rwc` makes SQLite create the file on first use.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("issuesync.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs.max(1))
    }

    /// Configured user, or the nil UUID for single-user installs.
    pub fn user_id(&self) -> Uuid {
        self.sync.user_id.unwrap_or_else(Uuid::nil)
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "issuesync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/issuesync` or `~/.local/state/issuesync`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "issuesync").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
