//! Error types for the user directory and cache.

use credits_db::StoreError;
use credits_types::UserId;

/// Errors surfaced by [`crate::UserDirectory`] and [`crate::UserCache`].
///
/// A missing record is never an error; lookups return `Option`.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A cache-only update targeted an identity that is not cached.
    #[error("user {0} is not cached")]
    NotCached(UserId),

    /// A record that lost an insert race could not be read back.
    #[error("user {0} vanished while being created")]
    Vanished(UserId),
}
