//! The user directory: one entry point for reading and writing user records.
//!
//! Reads are cache-first and fall back to the record store, promoting any
//! hit into the cache. Writes go to the store first and reach the cache
//! only once the store has accepted them, so the cache never holds a value
//! the store rejected.
//!
//! ```text
//! caller --> UserDirectory --> UserCache  (hit)
//!                 |
//!                 +---------> RecordStore (miss, then promote)
//! ```

use credits_db::RecordStore;
use credits_types::{UserId, UserRecord};
use tokio::sync::Mutex;

use crate::cache::UserCache;
use crate::error::DirectoryError;

/// Result of [`UserDirectory::modify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification<E> {
    /// The new record was written to the store and the cache.
    Applied(UserRecord),
    /// The change refused the current record; nothing was written.
    Refused(E),
    /// No stored record has this identity.
    Missing,
}

/// Cache-over-store facade for user records.
#[derive(Debug)]
pub struct UserDirectory {
    store: RecordStore,
    cache: UserCache,
    /// Serializes store writes with their cache write-through so the cache
    /// observes writes in the order the store applied them.
    writes: Mutex<()>,
}

impl UserDirectory {
    /// Build a directory over a connected store with an empty cache.
    pub fn new(store: RecordStore) -> Self {
        Self {
            store,
            cache: UserCache::new(),
            writes: Mutex::new(()),
        }
    }

    /// The backing store.
    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The in-memory cache. Only the directory mutates it.
    pub const fn cache(&self) -> &UserCache {
        &self.cache
    }

    /// Return the record for a connecting player, creating a zero-balance
    /// record on first sight.
    ///
    /// Idempotent: concurrent first-sight calls for the same identity
    /// persist exactly one record. If the platform reports a different
    /// display name than the stored one, the stored name is updated.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Store`] if the store fails.
    pub async fn get_or_create(
        &self,
        id: UserId,
        name: &str,
    ) -> Result<UserRecord, DirectoryError> {
        let record = match self.get_user(id).await? {
            Some(record) => record,
            None => self.create(id, name).await?,
        };

        if record.name == name {
            return Ok(record);
        }

        if let Some(renamed) = self.rename(id, name).await? {
            tracing::debug!(user = %id, from = %record.name, to = %name, "Updated display name");
            return Ok(renamed);
        }
        Ok(record)
    }

    /// Store the new display name alone, leaving balances as stored.
    async fn rename(&self, id: UserId, name: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let _guard = self.writes.lock().await;
        if !self.store.rename(id, name).await? {
            return Ok(None);
        }
        if let Ok(record) = self.cache.update(id, |record| record.with_name(name)) {
            return Ok(Some(record));
        }
        let stored = self.store.get(id).await?;
        Ok(stored.map(|record| self.cache.promote(record)))
    }

    async fn create(&self, id: UserId, name: &str) -> Result<UserRecord, DirectoryError> {
        let fresh = UserRecord::new(id, name);
        if self.store.add(&fresh).await? {
            tracing::info!(user = %id, name = %name, "Created user record");
            return Ok(self.cache.promote(fresh));
        }

        // Another caller inserted first; adopt its row.
        let winner = self
            .store
            .get(id)
            .await?
            .ok_or(DirectoryError::Vanished(id))?;
        Ok(self.cache.promote(winner))
    }

    /// Look up a record by identity, cache first.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Store`] if the store fails on a cache miss.
    pub async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError> {
        if let Some(record) = self.cache.get(id) {
            return Ok(Some(record));
        }
        let stored = self.store.get(id).await?;
        Ok(stored.map(|record| self.promote(record)))
    }

    /// Look up a record by display name (any case), cache first.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Store`] if the store fails on a cache miss.
    pub async fn get_user_by_name(
        &self,
        name: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        if let Some(record) = self.cache.get_by_name(name) {
            return Ok(Some(record));
        }
        let stored = self.store.get_by_name(name).await?;
        Ok(stored.map(|record| self.promote(record)))
    }

    fn promote(&self, record: UserRecord) -> UserRecord {
        tracing::debug!(user = %record.id, "Promoted user record into cache");
        self.cache.promote(record)
    }

    /// Credit balance for an identity, zero if unknown.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Store`] if the store fails on a cache miss.
    pub async fn credits_of(&self, id: UserId) -> Result<u32, DirectoryError> {
        Ok(self.get_user(id).await?.map_or(0, |record| record.credits))
    }

    /// Records for a set of connected identities, skipping unknown ones.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Store`] if the store fails.
    pub async fn get_online_users(
        &self,
        ids: &[UserId],
    ) -> Result<Vec<UserRecord>, DirectoryError> {
        let mut records = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(record) = self.get_user(id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Persist a record, then write it through to the cache.
    ///
    /// Returns `false` if the store has no record with this identity; the
    /// cache is left untouched in that case and on error.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Store`] if the store rejects or fails the
    /// write.
    pub async fn update_user(&self, record: &UserRecord) -> Result<bool, DirectoryError> {
        let _guard = self.writes.lock().await;
        if !self.store.update(record).await? {
            tracing::debug!(user = %record.id, "Update matched no stored record");
            return Ok(false);
        }
        self.cache.add(record.clone());
        Ok(true)
    }

    /// Read the current stored record, derive its successor with `change`,
    /// and write it, all under the directory's write lock.
    ///
    /// No other directory write can land between the read and the write, so
    /// `change` always sees the latest balance. The identity is preserved
    /// even if `change` alters it.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Store`] if the store fails. The cache is
    /// left untouched in that case.
    pub async fn modify<F, E>(&self, id: UserId, change: F) -> Result<Modification<E>, DirectoryError>
    where
        F: FnOnce(&UserRecord) -> Result<UserRecord, E> + Send,
        E: Send,
    {
        let _guard = self.writes.lock().await;
        let Some(current) = self.store.get(id).await? else {
            return Ok(Modification::Missing);
        };
        let mut next = match change(&current) {
            Ok(next) => next,
            Err(refusal) => return Ok(Modification::Refused(refusal)),
        };
        next.id = id;
        if !self.store.update(&next).await? {
            return Ok(Modification::Missing);
        }
        self.cache.add(next.clone());
        Ok(Modification::Applied(next))
    }

    /// Forget a player who disconnected. The store is unaffected.
    pub fn on_logout(&self, id: UserId, name: &str) {
        self.cache.remove(id, name);
        tracing::debug!(user = %id, "Evicted user on logout");
    }

    /// Drop every cached record. The store is unaffected.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// One page of records ordered by balance, straight from the store.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Store`] if the store fails.
    pub async fn get_page_of_users(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<UserRecord>, DirectoryError> {
        Ok(self.store.get_page(limit, offset).await?)
    }
}
