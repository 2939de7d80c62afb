//! Error types for the migration importer.
//!
//! A single unreadable line, file, or lookup never aborts an import; those
//! are logged and the record is dropped. [`MigrateError`] covers failures
//! that stop the whole run.

use credits_db::StoreError;

/// Errors that can abort a migration.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A source file or directory could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path being read.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The source or target store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A legacy player file is not valid YAML.
    #[error("invalid player file {path}: {source}")]
    PlayerFile {
        /// The file being parsed.
        path: String,
        /// The underlying parse error.
        source: serde_yml::Error,
    },

    /// The local name cache is not valid JSON.
    #[error("invalid name cache: {0}")]
    NameCache(#[from] serde_json::Error),

    /// A profile lookup failed at the network level.
    #[error("profile lookup failed: {0}")]
    Lookup(String),
}

impl MigrateError {
    /// Attach the path to an I/O error.
    pub fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
