//! Transaction engine for mcMMO credits.
//!
//! Every balance mutation (add, set, take, pay, redeem) goes through this
//! crate. A mutation moves through an explicit state machine:
//!
//! ```text
//! Transaction (Proposed)
//!     |
//!     +-- precondition fails ------------> Rejected(FailureReason)
//!     |
//!     +-- announce to listeners
//!             |
//!             +-- a listener cancels ----> Cancelled
//!             |
//!             +-- Announced
//!                    |
//!                    +-- directory write ok ----> Applied (+ feedback)
//!                    +-- no such record -------> NotApplied (+ error report)
//! ```
//!
//! Validation and announcement are synchronous so they can run on the
//! thread that owns game state; the directory write is async.
//!
//! # Modules
//!
//! - [`transaction`] -- [`Transaction`], its kinds, and [`TransactionBuilder`]
//! - [`listener`] -- [`TransactionListener`] and the [`Announcement`] they see
//! - [`feedback`] -- The [`Messenger`] seam and message keys
//! - [`progression`] -- The [`ProgressionSystem`] seam used by redemption
//! - [`engine`] -- [`TransactionEngine`] tying it all together

pub mod engine;
pub mod feedback;
pub mod listener;
pub mod progression;
pub mod transaction;

use credits_core::DirectoryError;
use credits_types::UserId;

pub use engine::{Announced, Proposal, TransactionEngine, TransactionOutcome};
pub use feedback::{Feedback, Messenger, Recipient};
pub use listener::{Announcement, TransactionListener};
pub use progression::{CategoryLevel, ProgressionError, ProgressionSystem};
pub use transaction::{FailureReason, Mutation, Transaction, TransactionBuilder, TransactionKind};

/// Errors that can occur while building or applying a transaction.
///
/// Precondition failures are not errors; they are reported as
/// [`TransactionOutcome::Rejected`].
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The user directory failed while writing.
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// A required field was not set on a [`TransactionBuilder`].
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field was set that the transaction kind does not accept.
    #[error("field {field} is not valid for {kind} transactions")]
    UnexpectedField {
        /// The offending field.
        field: &'static str,
        /// The transaction kind being built.
        kind: &'static str,
    },

    /// A partially applied transaction could not be rolled back.
    #[error("failed to restore user {user} after a partial transaction: {source}")]
    Compensation {
        /// The user whose record may now be out of step.
        user: UserId,
        /// The error raised by the restoring write.
        source: DirectoryError,
    },
}
