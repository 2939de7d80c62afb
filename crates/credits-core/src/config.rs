//! Configuration loading and typed config structures for mcMMO credits.
//!
//! The canonical configuration lives in `credits-config.yaml` next to the
//! server. Every field has a default, so a missing file or a partial file
//! is valid. Values are read once at startup and never change afterwards.

use std::path::{Path, PathBuf};

use credits_db::StoreConfig;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `credits-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CreditsConfig {
    /// Record store backend and pool settings.
    #[serde(default)]
    pub storage: StoreConfig,

    /// One-shot legacy data import.
    #[serde(default)]
    pub migration: MigrationConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CreditsConfig {
    /// Load configuration from a YAML file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file exists but cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            let mut config = Self::default();
            config.apply_env_overrides();
            return Ok(config);
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// `CREDITS_DATABASE_URL` replaces `storage.url`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CREDITS_DATABASE_URL") {
            self.storage.url = val;
        }
    }
}

/// Where legacy records are imported from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationSource {
    /// `id,name,credits,redeemed` lines in a text file.
    #[default]
    Csv,
    /// Every record of a previous record store.
    Storage,
    /// Legacy per-player `<uuid>.yml` files without display names.
    PlayerFiles,
}

/// Legacy data import settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MigrationConfig {
    /// Run the import at startup.
    #[serde(default)]
    pub enabled: bool,

    /// Which legacy format to read.
    #[serde(default)]
    pub source: MigrationSource,

    /// Delimited file for [`MigrationSource::Csv`].
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,

    /// Directory of `<uuid>.yml` files for [`MigrationSource::PlayerFiles`].
    #[serde(default = "default_player_dir")]
    pub player_dir: PathBuf,

    /// Optional local id-to-name cache (`usercache.json`) consulted before
    /// the lookup service.
    #[serde(default)]
    pub name_cache: Option<PathBuf>,

    /// Store to read for [`MigrationSource::Storage`].
    #[serde(default)]
    pub previous_storage: StoreConfig,

    /// Lookup attempts per identity, the first one included, before the
    /// record is dropped.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Fixed delay between lookup attempts, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Lookup requests per second, shared by all concurrent resolutions.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Base URL of the profile lookup service.
    #[serde(default = "default_lookup_url")]
    pub lookup_url: String,

    /// Rows per insert transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source: MigrationSource::default(),
            csv_path: default_csv_path(),
            player_dir: default_player_dir(),
            name_cache: None,
            previous_storage: StoreConfig::default(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            requests_per_second: default_requests_per_second(),
            lookup_url: default_lookup_url(),
            batch_size: default_batch_size(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

fn default_csv_path() -> PathBuf {
    PathBuf::from("database.csv")
}

fn default_player_dir() -> PathBuf {
    PathBuf::from("userdata")
}

const fn default_retries() -> u32 {
    3
}

const fn default_retry_delay_ms() -> u64 {
    30_000
}

const fn default_requests_per_second() -> u32 {
    15
}

fn default_lookup_url() -> String {
    "https://sessionserver.mojang.com/session/minecraft/profile".to_owned()
}

const fn default_batch_size() -> usize {
    500
}

fn default_log_level() -> String {
    "info".to_owned()
}
