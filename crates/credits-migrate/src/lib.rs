//! One-shot legacy data importer for mcMMO credits.
//!
//! Copies every record of a legacy source into the live record store:
//!
//! ```text
//! Source::from_config
//!     |
//!     +-- csv           --> CsvSource          (uuid,name,credits,redeemed)
//!     +-- storage       --> StoreSource        (previous record store)
//!     +-- player_files  --> PlayerFileSource   (<uuid>.yml + name lookups)
//!                               |
//!                               +-- Importer::run --> add_batch --> verify
//! ```
//!
//! Malformed input lines, unreadable player files, and players whose name
//! cannot be resolved are skipped with a warning. Store failures abort.
//!
//! # Modules
//!
//! - [`source`] -- The [`UserSource`] trait and config-driven [`Source`]
//! - [`csv`] -- Delimited text files
//! - [`storage`] -- A previous record store
//! - [`player_files`] -- Legacy per-player files
//! - [`resolver`] -- Remote profile name lookups
//! - [`importer`] -- Bulk insert and verification
//! - [`error`] -- Shared error types

pub mod csv;
pub mod error;
pub mod importer;
pub mod player_files;
pub mod resolver;
pub mod source;
pub mod storage;

pub use csv::CsvSource;
pub use error::MigrateError;
pub use importer::{ImportReport, Importer};
pub use player_files::PlayerFileSource;
pub use resolver::{NameResolver, ProfileResolver};
pub use source::{Source, UserSource};
pub use storage::StoreSource;
