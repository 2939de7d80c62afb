//! Process-lifetime wiring of the user data subsystem.
//!
//! A [`CreditsContext`] is built once at startup from the loaded
//! configuration and handed to every caller that needs the directory or
//! the chat correlator. Shutting it down cancels pending chat requests and
//! closes the store's connection pool.

use std::sync::Arc;

use credits_db::RecordStore;

use crate::chat::ChatCorrelator;
use crate::config::CreditsConfig;
use crate::directory::UserDirectory;
use crate::error::DirectoryError;

/// Shared handles for one running server.
#[derive(Debug, Clone)]
pub struct CreditsContext {
    config: Arc<CreditsConfig>,
    directory: Arc<UserDirectory>,
    chat: Arc<ChatCorrelator>,
}

impl CreditsContext {
    /// Connect the configured store and build the directory around it.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Store`] if the store cannot be reached or
    /// its schema cannot be created.
    pub async fn start(config: CreditsConfig) -> Result<Self, DirectoryError> {
        let store = RecordStore::connect(&config.storage).await?;
        Ok(Self::with_store(config, store))
    }

    /// Build a context around an already connected store.
    pub fn with_store(config: CreditsConfig, store: RecordStore) -> Self {
        tracing::info!(backend = ?config.storage.backend, "Credits context started");
        Self {
            config: Arc::new(config),
            directory: Arc::new(UserDirectory::new(store)),
            chat: Arc::new(ChatCorrelator::new()),
        }
    }

    /// The immutable configuration this context was built from.
    pub fn config(&self) -> &CreditsConfig {
        &self.config
    }

    /// Shared user directory.
    pub fn directory(&self) -> Arc<UserDirectory> {
        Arc::clone(&self.directory)
    }

    /// Shared chat correlator.
    pub fn chat(&self) -> Arc<ChatCorrelator> {
        Arc::clone(&self.chat)
    }

    /// Cancel pending chat requests, drop cached records, and close the store.
    pub async fn shutdown(self) {
        let pending = self.chat.len();
        self.chat.clear();
        self.directory.clear_cache();
        self.directory.store().close().await;
        tracing::info!(cancelled_chat_requests = pending, "Credits context shut down");
    }
}
