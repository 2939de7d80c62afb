//! Bulk import of legacy records into the live store.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use credits_db::RecordStore;
use credits_types::{UserId, UserRecord};

use crate::error::MigrateError;
use crate::source::UserSource;

/// Outcome of one import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Name of the source strategy.
    pub source: &'static str,
    /// Distinct records read from the source.
    pub loaded: usize,
    /// Records newly inserted. Ids already present in the target are skipped.
    pub inserted: u64,
    /// Loaded ids found in the target afterwards.
    pub verified: usize,
    /// Loaded ids absent from the target afterwards.
    pub missing: Vec<UserId>,
    /// Wall time of the whole run.
    pub elapsed: Duration,
}

impl ImportReport {
    /// True when every loaded record is present in the target.
    pub const fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Moves every record of a [`UserSource`] into a target store.
#[derive(Debug, Clone)]
pub struct Importer {
    target: RecordStore,
}

impl Importer {
    /// Importer writing into `target`. Chunking follows the store's batch size.
    pub const fn new(target: RecordStore) -> Self {
        Self { target }
    }

    /// The target store.
    pub const fn target(&self) -> &RecordStore {
        &self.target
    }

    /// Load, insert, and verify.
    ///
    /// Duplicate ids in the source keep their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError`] if the source cannot be read or the target
    /// store fails.
    pub async fn run<S: UserSource>(&self, source: &S) -> Result<ImportReport, MigrateError> {
        let started = Instant::now();
        tracing::info!(source = source.name(), "Starting import");

        let users = dedupe(source.load_users().await?);
        let loaded = users.len();
        tracing::info!(source = source.name(), loaded, "Source records loaded");

        let inserted = self.target.add_batch(&users).await?;

        let present: HashSet<UserId> = self
            .target
            .get_all()
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect();
        let missing: Vec<UserId> = users
            .iter()
            .map(|record| record.id)
            .filter(|id| !present.contains(id))
            .collect();

        let report = ImportReport {
            source: source.name(),
            loaded,
            inserted,
            verified: loaded.saturating_sub(missing.len()),
            missing,
            elapsed: started.elapsed(),
        };

        if report.is_complete() {
            tracing::info!(
                source = report.source,
                loaded = report.loaded,
                inserted = report.inserted,
                elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
                "Import complete"
            );
        } else {
            tracing::error!(
                source = report.source,
                loaded = report.loaded,
                missing = report.missing.len(),
                "Import incomplete, records missing from target"
            );
        }
        Ok(report)
    }
}

fn dedupe(users: Vec<UserRecord>) -> Vec<UserRecord> {
    let mut seen = HashSet::with_capacity(users.len());
    let before = users.len();
    let unique: Vec<UserRecord> = users.into_iter().filter(|user| seen.insert(user.id)).collect();
    if unique.len() != before {
        tracing::warn!(
            duplicates = before.saturating_sub(unique.len()),
            "Source contained duplicate ids, keeping first occurrence"
        );
    }
    unique
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let id = UserId::new();
        let users = vec![
            UserRecord::new(id, "first").with_credits(1),
            UserRecord::new(UserId::new(), "other"),
            UserRecord::new(id, "second").with_credits(2),
        ];
        let unique = dedupe(users);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].name, "first");
        assert_eq!(unique[0].credits, 1);
    }
}
