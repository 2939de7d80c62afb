//! User cache, user directory, and chat correlation for mcMMO credits.
//!
//! This crate owns everything between callers (commands, menus, event
//! listeners) and the record store:
//!
//! ```text
//! UI / commands --> UserDirectory --> UserCache
//!                        |
//!                        +----------> RecordStore (credits-db)
//!
//! chat listener --> ChatCorrelator --> waiting UI workflow
//! ```
//!
//! # Modules
//!
//! - [`config`] -- `credits-config.yaml` loader and typed settings
//! - [`cache`] -- Dual-keyed in-memory [`UserCache`]
//! - [`directory`] -- Read-through, write-through [`UserDirectory`]
//! - [`chat`] -- [`ChatCorrelator`] for "wait for this player's next line"
//! - [`context`] -- [`CreditsContext`], the process-lifetime wiring
//! - [`error`] -- Shared error types

pub mod cache;
pub mod chat;
pub mod config;
pub mod context;
pub mod directory;
pub mod error;

pub use cache::{CacheStats, UserCache};
pub use chat::{ChatCorrelator, Continuation};
pub use config::{ConfigError, CreditsConfig, LoggingConfig, MigrationConfig, MigrationSource};
pub use context::CreditsContext;
pub use directory::{Modification, UserDirectory};
pub use error::DirectoryError;
