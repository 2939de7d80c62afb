//! Interchangeable legacy record sources.
//!
//! Every strategy yields plain [`UserRecord`]s, so all of them feed the
//! same bulk-insert path in [`crate::Importer`].

use std::future::Future;
use std::time::Duration;

use credits_core::{MigrationConfig, MigrationSource};
use credits_types::UserRecord;

use crate::csv::CsvSource;
use crate::error::MigrateError;
use crate::player_files::PlayerFileSource;
use crate::resolver::ProfileResolver;
use crate::storage::StoreSource;

/// A legacy source that can produce every record it holds.
pub trait UserSource: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &'static str;

    /// Read every usable record. Unusable entries are skipped, not fatal.
    fn load_users(&self) -> impl Future<Output = Result<Vec<UserRecord>, MigrateError>> + Send;
}

/// The source selected by configuration.
///
/// Uses enum dispatch because [`UserSource`] is not dyn-compatible.
#[derive(Debug)]
pub enum Source {
    /// Delimited text file.
    Csv(CsvSource),
    /// Previous record store.
    Storage(StoreSource),
    /// Legacy per-player files with remote name resolution.
    PlayerFiles(PlayerFileSource<ProfileResolver>),
}

impl Source {
    /// Build the source named by `config.source`.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Store`] if a previous store cannot be opened,
    /// or [`MigrateError::Lookup`] if the profile lookup client cannot be
    /// built.
    pub async fn from_config(config: &MigrationConfig) -> Result<Self, MigrateError> {
        let source = match config.source {
            MigrationSource::Csv => Self::Csv(CsvSource::new(&config.csv_path)),
            MigrationSource::Storage => {
                Self::Storage(StoreSource::connect(&config.previous_storage).await?)
            }
            MigrationSource::PlayerFiles => {
                let resolver = ProfileResolver::new(&config.lookup_url)?;
                let mut source = PlayerFileSource::new(&config.player_dir, resolver)
                    .with_max_attempts(config.retries)
                    .with_retry_delay(Duration::from_millis(config.retry_delay_ms))
                    .with_requests_per_second(config.requests_per_second);
                if let Some(cache) = &config.name_cache {
                    source = source.with_name_cache(cache);
                }
                Self::PlayerFiles(source)
            }
        };
        Ok(source)
    }
}

impl UserSource for Source {
    fn name(&self) -> &'static str {
        match self {
            Self::Csv(source) => source.name(),
            Self::Storage(source) => source.name(),
            Self::PlayerFiles(source) => source.name(),
        }
    }

    async fn load_users(&self) -> Result<Vec<UserRecord>, MigrateError> {
        match self {
            Self::Csv(source) => source.load_users().await,
            Self::Storage(source) => source.load_users().await,
            Self::PlayerFiles(source) => source.load_users().await,
        }
    }
}
