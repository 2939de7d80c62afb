//! The transaction engine.
//!
//! [`TransactionEngine::propose`] validates a transaction and announces it
//! to listeners; [`TransactionEngine::commit`] writes an announced
//! transaction through the user directory and emits feedback.
//! [`TransactionEngine::execute`] does both. The split lets a caller
//! propose on the thread that owns game state and commit elsewhere.

use std::convert::Infallible;
use std::sync::{Arc, PoisonError, RwLock};

use credits_core::{Modification, UserDirectory};
use credits_types::{UserId, UserRecord};

use crate::LedgerError;
use crate::feedback::{Feedback, Messenger, Recipient};
use crate::listener::{Announcement, TransactionListener};
use crate::progression::ProgressionSystem;
use crate::transaction::{
    FAILURE_MESSAGE_KEY, FailureReason, Mutation, Transaction, TransactionKind,
};

/// Result of [`TransactionEngine::propose`].
#[derive(Debug)]
pub enum Proposal {
    /// A precondition failed; nothing was announced.
    Rejected(FailureReason),
    /// A listener vetoed the transaction.
    Cancelled(Transaction),
    /// Ready to commit.
    Announced(Announced),
}

/// A transaction that passed validation and announcement.
///
/// Only the engine creates these, so [`TransactionEngine::commit`] can
/// never write a transaction that skipped either step.
#[derive(Debug)]
pub struct Announced {
    transaction: Transaction,
    mutation: Mutation,
    notify_user: bool,
    notify_initiator: bool,
}

impl Announced {
    /// The announced transaction.
    pub const fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    /// The records the transaction produces from the records it was built
    /// with. The committed records are derived from the stored ones and
    /// may differ.
    pub const fn mutation(&self) -> &Mutation {
        &self.mutation
    }
}

/// Terminal state of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Written; feedback was emitted per the toggles. Carries the records
    /// as stored.
    Applied(Mutation),
    /// A listener vetoed it; nothing was written.
    Cancelled,
    /// A precondition failed, either when proposed or against the stored
    /// balance at commit; nothing was left written.
    Rejected(FailureReason),
    /// The directory had no record to update; the initiator got an error
    /// report.
    NotApplied,
}

impl TransactionOutcome {
    /// Whether the mutation was written.
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Where one record write left a commit.
enum Step {
    Written(UserRecord),
    Stopped(TransactionOutcome),
}

/// Validates, announces, and applies balance mutations.
pub struct TransactionEngine {
    directory: Arc<UserDirectory>,
    messenger: Arc<dyn Messenger>,
    progression: Arc<dyn ProgressionSystem>,
    listeners: RwLock<Vec<Arc<dyn TransactionListener>>>,
}

impl core::fmt::Debug for TransactionEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransactionEngine")
            .field("directory", &self.directory)
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

impl TransactionEngine {
    /// Create an engine writing through `directory`.
    pub fn new(
        directory: Arc<UserDirectory>,
        messenger: Arc<dyn Messenger>,
        progression: Arc<dyn ProgressionSystem>,
    ) -> Self {
        Self {
            directory,
            messenger,
            progression,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Register a listener for future announcements.
    pub fn register_listener(&self, listener: Arc<dyn TransactionListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // -----------------------------------------------------------------------
    // Proposed -> Announced | Cancelled | Rejected
    // -----------------------------------------------------------------------

    /// Validate a transaction and announce it to every listener.
    ///
    /// Runs synchronously. A transaction that fails validation is never
    /// announced.
    pub fn propose(&self, transaction: Transaction) -> Proposal {
        let mutation = match self.validate(&transaction) {
            Ok(mutation) => mutation,
            Err(reason) => {
                tracing::debug!(
                    kind = %transaction.kind(),
                    target = %transaction.target().id,
                    reason = %reason,
                    "Transaction rejected"
                );
                return Proposal::Rejected(reason);
            }
        };

        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut announcement = Announcement::new(&transaction, &mutation);
        for listener in &listeners {
            listener.on_announce(&mut announcement);
        }

        if announcement.is_cancelled() {
            tracing::debug!(
                kind = %transaction.kind(),
                target = %transaction.target().id,
                "Transaction cancelled by listener"
            );
            return Proposal::Cancelled(transaction);
        }

        let notify_user = announcement.notifies_user();
        let notify_initiator = announcement.notifies_initiator();
        Proposal::Announced(Announced {
            transaction,
            mutation,
            notify_user,
            notify_initiator,
        })
    }

    fn validate(&self, transaction: &Transaction) -> Result<Mutation, FailureReason> {
        let mutation = transaction.mutation()?;
        if let TransactionKind::Redeem(category) = transaction.kind() {
            let standing = self
                .progression
                .level(transaction.target().id, category)
                .ok_or(FailureReason::ProfileUnavailable)?;
            if !standing.accepts(transaction.amount()) {
                return Err(FailureReason::CategoryCapped);
            }
        }
        Ok(mutation)
    }

    // -----------------------------------------------------------------------
    // Announced -> Applied | NotApplied
    // -----------------------------------------------------------------------

    /// Write an announced transaction and emit feedback.
    ///
    /// Each record is re-read and changed under the directory's write lock,
    /// so the balance rules are checked against the stored balance rather
    /// than the one captured when the transaction was built. A transaction
    /// that no longer fits is returned as [`TransactionOutcome::Rejected`].
    /// Rollbacks apply the inverse change to the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Directory`] if the directory fails; the
    /// initiator receives an error report first. Returns
    /// [`LedgerError::Compensation`] if a partially applied transaction
    /// could not be rolled back.
    pub async fn commit(&self, announced: Announced) -> Result<TransactionOutcome, LedgerError> {
        let Announced {
            transaction,
            notify_user,
            notify_initiator,
            ..
        } = announced;

        let mut payer = None;
        if let Some(original) = transaction.payer() {
            let debit = |current: &UserRecord| transaction.payer_after(current);
            match self.apply(&transaction, original.id, debit).await? {
                Step::Written(record) => payer = Some(record),
                Step::Stopped(outcome) => return Ok(outcome),
            }
        }

        let change = |current: &UserRecord| transaction.target_after(current);
        let target = match self.apply(&transaction, transaction.target().id, change).await {
            Ok(Step::Written(record)) => record,
            Ok(Step::Stopped(outcome)) => {
                self.refund_payer(&transaction, payer.as_ref()).await?;
                return Ok(outcome);
            }
            Err(err) => {
                self.refund_payer(&transaction, payer.as_ref()).await?;
                return Err(err);
            }
        };

        if let TransactionKind::Redeem(category) = transaction.kind() {
            let amount = transaction.amount();
            let granted = self.progression.add_levels(target.id, category, amount);
            if let Err(err) = granted {
                tracing::warn!(
                    user = %target.id,
                    error = %err,
                    "Redemption failed, restoring balance"
                );
                self.compensate(target.id, |current| {
                    current
                        .clone()
                        .with_credits(current.credits.saturating_add(amount))
                        .with_redeemed(current.redeemed.saturating_sub(amount))
                })
                .await?;
                return Ok(TransactionOutcome::Rejected(FailureReason::ProfileUnavailable));
            }
        }

        tracing::info!(
            kind = %transaction.kind(),
            initiator = %transaction.initiator(),
            target = %target.id,
            amount = transaction.amount(),
            credits = target.credits,
            "Transaction applied"
        );

        if notify_initiator {
            self.notify(
                &transaction,
                transaction.initiator().into(),
                transaction.message_key(),
                &target,
            );
        }
        // A self transaction gets one message, the user's one standing in
        // when the initiator's is silenced.
        if notify_user && (!transaction.is_self_transaction() || !notify_initiator) {
            self.notify(
                &transaction,
                Recipient::Player(target.id),
                transaction.user_message_key(),
                &target,
            );
        }

        Ok(TransactionOutcome::Applied(Mutation { target, payer }))
    }

    /// Propose and, unless rejected or cancelled, commit.
    ///
    /// # Errors
    ///
    /// See [`TransactionEngine::commit`].
    pub async fn execute(&self, transaction: Transaction) -> Result<TransactionOutcome, LedgerError> {
        match self.propose(transaction) {
            Proposal::Rejected(reason) => Ok(TransactionOutcome::Rejected(reason)),
            Proposal::Cancelled(_) => Ok(TransactionOutcome::Cancelled),
            Proposal::Announced(announced) => self.commit(announced).await,
        }
    }

    /// Change one stored record, reporting failure to the initiator.
    async fn apply<F>(
        &self,
        transaction: &Transaction,
        id: UserId,
        change: F,
    ) -> Result<Step, LedgerError>
    where
        F: FnOnce(&UserRecord) -> Result<UserRecord, FailureReason> + Send,
    {
        match self.directory.modify(id, change).await {
            Ok(Modification::Applied(record)) => Ok(Step::Written(record)),
            Ok(Modification::Refused(reason)) => {
                tracing::debug!(
                    kind = %transaction.kind(),
                    user = %id,
                    reason = %reason,
                    "Transaction no longer fits the stored balance"
                );
                Ok(Step::Stopped(TransactionOutcome::Rejected(reason)))
            }
            Ok(Modification::Missing) => {
                tracing::warn!(user = %id, "Transaction target has no stored record");
                self.report_failure(transaction);
                Ok(Step::Stopped(TransactionOutcome::NotApplied))
            }
            Err(err) => {
                tracing::error!(user = %id, error = %err, "Transaction write failed");
                self.report_failure(transaction);
                Err(err.into())
            }
        }
    }

    async fn refund_payer(
        &self,
        transaction: &Transaction,
        payer: Option<&UserRecord>,
    ) -> Result<(), LedgerError> {
        if let Some(payer) = payer {
            let amount = transaction.amount();
            self.compensate(payer.id, |current| {
                current
                    .clone()
                    .with_credits(current.credits.saturating_add(amount))
            })
            .await?;
        }
        Ok(())
    }

    /// Undo a written change by applying its inverse to the stored record.
    async fn compensate<F>(&self, id: UserId, undo: F) -> Result<(), LedgerError>
    where
        F: FnOnce(&UserRecord) -> UserRecord + Send,
    {
        let result = self
            .directory
            .modify(id, |current| Ok::<_, Infallible>(undo(current)))
            .await;
        match result {
            Ok(Modification::Applied(_) | Modification::Refused(_)) => Ok(()),
            Ok(Modification::Missing) => {
                tracing::warn!(user = %id, "Record vanished before it could be restored");
                Ok(())
            }
            Err(source) => Err(LedgerError::Compensation { user: id, source }),
        }
    }

    fn report_failure(&self, transaction: &Transaction) {
        self.notify(
            transaction,
            transaction.initiator().into(),
            FAILURE_MESSAGE_KEY,
            transaction.target(),
        );
    }

    fn notify(
        &self,
        transaction: &Transaction,
        recipient: Recipient,
        key: &'static str,
        target: &UserRecord,
    ) {
        self.messenger.send(Feedback {
            recipient,
            key,
            kind: transaction.kind(),
            amount: transaction.amount(),
            initiator: transaction.initiator(),
            target: target.clone(),
        });
    }
}
