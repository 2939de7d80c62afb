//! Previous-store source: every record of another record store.

use credits_db::{RecordStore, StoreConfig};
use credits_types::UserRecord;

use crate::error::MigrateError;
use crate::source::UserSource;

/// Reads all records from a previous store, then closes it.
#[derive(Debug, Clone)]
pub struct StoreSource {
    store: RecordStore,
}

impl StoreSource {
    /// Wrap an already connected store.
    pub const fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Connect to the previous store.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Store`] if the store cannot be opened.
    pub async fn connect(config: &StoreConfig) -> Result<Self, MigrateError> {
        Ok(Self::new(RecordStore::connect(config).await?))
    }
}

impl UserSource for StoreSource {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn load_users(&self) -> Result<Vec<UserRecord>, MigrateError> {
        let users = self.store.get_all().await;
        self.store.close().await;
        Ok(users?)
    }
}
