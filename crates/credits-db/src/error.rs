//! Error types for the record store.
//!
//! Absence of a record is never an error here: lookups return `Option` and
//! conditional writes return `bool`. [`StoreError`] covers the cases a
//! caller cannot express as a value.

/// Errors that can occur in the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database or connection pool reported a failure.
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),

    /// A write was rejected by the table's check constraints
    /// (for example a negative credit balance).
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// The connection URL names a backend this build cannot reach.
    #[error("unsupported database URL: {0}")]
    UnsupportedUrl(String),

    /// A stored row could not be mapped back into a record.
    #[error("corrupt row for {uuid}: {reason}")]
    CorruptRow {
        /// Raw identity column of the offending row.
        uuid: String,
        /// What failed to decode.
        reason: String,
    },
}

impl StoreError {
    /// Classify a failed write, separating check-constraint rejections from
    /// other database failures.
    pub fn from_write(err: sqlx::Error) -> Self {
        let is_check = err
            .as_database_error()
            .is_some_and(|db| matches!(db.kind(), sqlx::error::ErrorKind::CheckViolation));
        if is_check {
            Self::ConstraintViolation(err.to_string())
        } else {
            Self::Sql(err)
        }
    }
}
