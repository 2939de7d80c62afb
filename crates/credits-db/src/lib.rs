//! Record store for mcMMO credits.
//!
//! One logical table, `credits_users`, holds every player's balance and
//! redeemed counter. The store is reached through a pooled `sqlx` Any
//! connection so the same contract serves both supported backends:
//!
//! ```text
//! StoreConfig
//!     |
//!     +-- backend: embedded  --> SQLite file (created if missing)
//!     |
//!     +-- backend: networked --> PostgreSQL server
//!                                  |
//!                                  +-- RecordStore (async CRUD, paging, bulk insert)
//! ```
//!
//! Schema creation is idempotent and runs once when the store connects.
//!
//! # Modules
//!
//! - [`config`] -- Backend selection and pool tuning
//! - [`store`] -- The [`RecordStore`] itself
//! - [`error`] -- Shared error types

pub mod config;
pub mod error;
mod queries;
pub mod store;

pub use config::{Backend, Dialect, StoreConfig};
pub use error::StoreError;
pub use store::RecordStore;
