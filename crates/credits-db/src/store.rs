//! Async persistence for user records.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time checked)
//! so no live database is needed at build time. All queries are
//! parameterized.

use credits_types::{UserId, UserRecord};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};

use crate::config::{Dialect, StoreConfig};
use crate::error::StoreError;
use crate::queries::{self, Queries};

/// Default number of rows per transaction in [`RecordStore::add_batch`].
const DEFAULT_BATCH_SIZE: usize = 500;

/// Handle to the `credits_users` table.
///
/// Cheap to clone; clones share one connection pool. Every method is
/// async and runs on the pool, never on the caller's thread.
#[derive(Clone)]
pub struct RecordStore {
    pool: AnyPool,
    dialect: Dialect,
    batch_size: usize,
}

impl core::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordStore")
            .field("dialect", &self.dialect)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl RecordStore {
    /// Connect using the provided configuration and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnsupportedUrl`] if the backend URL cannot be
    /// served, or [`StoreError::Sql`] if connecting or creating the table
    /// fails.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();

        let (url, dialect) = config.connection()?;

        // Every connection to `sqlite::memory:` opens its own database, so
        // the pool must hold exactly one connection for its whole lifetime.
        let options = if config.is_in_memory() {
            AnyPoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            AnyPoolOptions::new()
                .max_connections(config.max_connections)
                .idle_timeout(config.idle_timeout())
        };

        let pool = options
            .acquire_timeout(config.connect_timeout())
            .connect(&url)
            .await?;

        tracing::info!(
            backend = ?config.backend,
            dialect = ?dialect,
            max_connections = config.max_connections,
            "Connected to record store"
        );

        let store = Self {
            pool,
            dialect,
            batch_size: DEFAULT_BATCH_SIZE,
        };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Set the number of rows inserted per transaction by
    /// [`RecordStore::add_batch`]. Zero is treated as one.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = if size == 0 { 1 } else { size };
        self
    }

    /// The dialect this store speaks.
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Return a reference to the underlying [`AnyPool`].
    pub const fn pool(&self) -> &AnyPool {
        &self.pool
    }

    const fn queries(&self) -> &'static Queries {
        queries::for_dialect(self.dialect)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        for &statement in queries::SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Ensured credits_users schema");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Look up a record by identity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the query fails, or
    /// [`StoreError::CorruptRow`] if the row cannot be decoded.
    pub async fn get(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(self.queries().get_by_id)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_record).transpose()
    }

    /// Look up a record by display name, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the query fails, or
    /// [`StoreError::CorruptRow`] if the row cannot be decoded.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(self.queries().get_by_name)
            .bind(name.trim().to_owned())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(parse_record).transpose()
    }

    /// One page of records ordered by balance, highest first. Ties are
    /// broken by identity so pages never overlap.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the query fails.
    pub async fn get_page(&self, limit: u32, offset: u32) -> Result<Vec<UserRecord>, StoreError> {
        let rows = sqlx::query(self.queries().page)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_record).collect()
    }

    /// Every stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the query fails.
    pub async fn get_all(&self) -> Result<Vec<UserRecord>, StoreError> {
        let rows = sqlx::query(self.queries().all)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(parse_record).collect()
    }

    /// Number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the query fails.
    pub async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(self.queries().count)
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a new record.
    ///
    /// Returns `false` if a record with the same identity already exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConstraintViolation`] if a check constraint
    /// rejects the row, or [`StoreError::Sql`] for any other failure.
    pub async fn add(&self, record: &UserRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(self.queries().insert)
            .bind(record.id.to_string())
            .bind(record.name.clone())
            .bind(i64::from(record.credits))
            .bind(i64::from(record.redeemed))
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_write)?;
        Ok(result.rows_affected() == 1)
    }

    /// Overwrite the name, balance, and redeemed counter of an existing
    /// record.
    ///
    /// Returns `false` if no record with that identity exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConstraintViolation`] if a check constraint
    /// rejects the row, or [`StoreError::Sql`] for any other failure.
    pub async fn update(&self, record: &UserRecord) -> Result<bool, StoreError> {
        let result = sqlx::query(self.queries().update)
            .bind(record.name.clone())
            .bind(i64::from(record.credits))
            .bind(i64::from(record.redeemed))
            .bind(record.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_write)?;
        Ok(result.rows_affected() == 1)
    }

    /// Change only the display name of an existing record. Balances are
    /// left as stored.
    ///
    /// Returns `false` if no record with that identity exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the write fails.
    pub async fn rename(&self, id: UserId, name: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(self.queries().rename)
            .bind(name.to_owned())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_write)?;
        Ok(result.rows_affected() == 1)
    }

    /// Bulk-insert records, skipping identities that already exist.
    ///
    /// Records are inserted in chunks of the configured batch size, each
    /// chunk inside its own transaction. Returns the number of rows
    /// actually inserted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any chunk fails; earlier chunks stay
    /// committed.
    pub async fn add_batch(&self, records: &[UserRecord]) -> Result<u64, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut inserted: u64 = 0;
        for chunk in records.chunks(self.batch_size) {
            let mut tx = self.pool.begin().await?;
            for record in chunk {
                let result = sqlx::query(self.queries().insert)
                    .bind(record.id.to_string())
                    .bind(record.name.clone())
                    .bind(i64::from(record.credits))
                    .bind(i64::from(record.redeemed))
                    .execute(&mut *tx)
                    .await
                    .map_err(StoreError::from_write)?;
                inserted = inserted.saturating_add(result.rows_affected());
            }
            tx.commit().await?;
            tracing::debug!(rows = chunk.len(), "Committed user batch");
        }

        tracing::info!(
            offered = records.len(),
            inserted,
            "Inserted user records (batch)"
        );
        Ok(inserted)
    }

    /// Close all connections in the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Record store closed");
    }

    /// Whether [`RecordStore::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn parse_record(row: &AnyRow) -> Result<UserRecord, StoreError> {
    let uuid: String = row.try_get("uuid")?;
    let corrupt = |reason: String| StoreError::CorruptRow {
        uuid: uuid.clone(),
        reason,
    };

    let id: UserId = uuid
        .parse()
        .map_err(|e: uuid::Error| corrupt(format!("identity: {e}")))?;
    let name: String = row.try_get("username")?;
    let credits: i64 = row.try_get("credits")?;
    let redeemed: i64 = row.try_get("redeemed")?;

    Ok(UserRecord {
        id,
        name,
        credits: u32::try_from(credits).map_err(|e| corrupt(format!("credits: {e}")))?,
        redeemed: u32::try_from(redeemed).map_err(|e| corrupt(format!("redeemed: {e}")))?,
    })
}
