//! Command-line entry point for the legacy data importer.
//!
//! ```text
//! credits-migrate [path/to/credits-config.yaml]
//! ```
//!
//! Reads the `migration` section of the config, imports from the configured
//! source into `storage`, and exits non-zero if any loaded record is missing
//! from the target afterwards.

use std::path::PathBuf;

use credits_core::CreditsConfig;
use credits_db::RecordStore;
use credits_migrate::{Importer, Source, UserSource};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Config path used when none is given on the command line.
const DEFAULT_CONFIG_PATH: &str = "credits-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the config cannot be loaded, a store cannot be
/// opened, or the import aborts.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = CreditsConfig::from_file(&config_path)?;

    // Initialize structured logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(config = %config_path.display(), "credits-migrate starting");

    let migration = &config.migration;
    if !migration.enabled {
        info!("migration.enabled is false, nothing to do");
        return Ok(());
    }

    let source = Source::from_config(migration).await?;
    info!(source = source.name(), "migration source configured");

    let target = RecordStore::connect(&config.storage)
        .await?
        .with_batch_size(migration.batch_size);
    let importer = Importer::new(target);

    let report = importer.run(&source).await?;
    importer.target().close().await;

    if !report.is_complete() {
        return Err(format!(
            "{} of {} records missing from target after import",
            report.missing.len(),
            report.loaded
        )
        .into());
    }

    info!(
        loaded = report.loaded,
        inserted = report.inserted,
        "credits-migrate finished"
    );
    Ok(())
}
