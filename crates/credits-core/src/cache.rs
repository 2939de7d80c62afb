//! In-memory index of recently touched user records.
//!
//! The cache is reachable by identity and by display name. Both keys live
//! behind one lock: records are stored once, keyed by [`UserId`], and the
//! name index maps a case-folded display name to the identity that holds
//! it. Every mutation rewrites the record and its name key together, so a
//! lookup by name and a lookup by identity can never disagree.
//!
//! Entries are evicted only on explicit removal (logout); there is no
//! capacity bound.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use credits_types::{UserId, UserRecord, name_key};

use crate::error::DirectoryError;

/// Records plus the name index that points into them.
#[derive(Debug, Default)]
struct CacheIndex {
    records: HashMap<UserId, UserRecord>,
    names: HashMap<String, UserId>,
}

impl CacheIndex {
    /// Drop the entry for `id` and its name key.
    fn evict(&mut self, id: UserId) -> Option<UserRecord> {
        let record = self.records.remove(&id)?;
        let key = record.name_key();
        if self.names.get(&key) == Some(&id) {
            self.names.remove(&key);
        }
        Some(record)
    }

    /// Insert `record`, evicting whatever it displaces.
    ///
    /// A previous entry for the same identity is replaced whole (its old
    /// name key goes with it). Another identity currently holding the same
    /// display name is stale, since names are unique at any instant, and
    /// is evicted whole as well.
    fn insert(&mut self, record: UserRecord) {
        let key = record.name_key();
        self.evict(record.id);
        if let Some(&holder) = self.names.get(&key) {
            self.evict(holder);
        }
        self.names.insert(key, record.id);
        self.records.insert(record.id, record);
    }
}

/// Dual-keyed user record cache.
///
/// Safe to share between the primary thread, store completions, and
/// background tasks. Authoritative for every entry it holds.
#[derive(Debug, Default)]
pub struct UserCache {
    index: RwLock<CacheIndex>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl UserCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    // The index is rewritten under a single write guard with no fallible
    // steps in between, so a poisoned lock still guards a coherent index.
    fn read(&self) -> RwLockReadGuard<'_, CacheIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_lookup(&self, found: bool) {
        let counter = if found { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether a record with this identity is cached.
    pub fn contains(&self, id: UserId) -> bool {
        self.read().records.contains_key(&id)
    }

    /// Whether a record with this display name (any case) is cached.
    pub fn contains_name(&self, name: &str) -> bool {
        self.read().names.contains_key(&name_key(name))
    }

    /// Cached record for an identity.
    pub fn get(&self, id: UserId) -> Option<UserRecord> {
        let found = self.read().records.get(&id).cloned();
        self.record_lookup(found.is_some());
        found
    }

    /// Cached record for a display name, ignoring case.
    pub fn get_by_name(&self, name: &str) -> Option<UserRecord> {
        let found = {
            let index = self.read();
            index
                .names
                .get(&name_key(name))
                .and_then(|id| index.records.get(id))
                .cloned()
        };
        self.record_lookup(found.is_some());
        found
    }

    /// Insert or replace a record under both keys.
    ///
    /// Any entry displaced by the identity or by the display name is
    /// evicted entirely.
    pub(crate) fn add(&self, record: UserRecord) {
        self.write().insert(record);
    }

    /// Insert `record` only if its identity is not cached yet, returning
    /// whichever record the cache holds afterwards.
    ///
    /// Used when promoting a store read: a concurrent write-through that
    /// landed first is newer than the read and must win.
    pub(crate) fn promote(&self, record: UserRecord) -> UserRecord {
        let mut index = self.write();
        if let Some(existing) = index.records.get(&record.id) {
            return existing.clone();
        }
        index.insert(record.clone());
        record
    }

    /// Evict every entry reachable by `id` or by `name`.
    pub(crate) fn remove(&self, id: UserId, name: &str) {
        let mut index = self.write();
        index.evict(id);
        if let Some(&holder) = index.names.get(&name_key(name)) {
            index.evict(holder);
        }
    }

    /// Replace the cached record for `id` with `f(record)`.
    ///
    /// The identity is preserved even if `f` changes it; a changed display
    /// name is re-indexed.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NotCached`] if `id` is not cached. This is
    /// not a read-through operation.
    pub(crate) fn update<F>(&self, id: UserId, f: F) -> Result<UserRecord, DirectoryError>
    where
        F: FnOnce(UserRecord) -> UserRecord,
    {
        let mut index = self.write();
        let current = index
            .records
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotCached(id))?;
        let mut next = f(current);
        next.id = id;
        index.insert(next.clone());
        Ok(next)
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    /// Whether the cache holds no records.
    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    /// Drop every entry.
    pub(crate) fn clear(&self) {
        let mut index = self.write();
        index.records.clear();
        index.names.clear();
    }

    /// Size and hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached records.
    pub size: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing cached.
    pub misses: u64,
}
