//! Transaction values and their builder.
//!
//! A [`Transaction`] is an ephemeral description of one balance mutation:
//! who asked for it, whose record it changes, what kind of change, and by
//! how much. It knows how to derive the resulting records from the current
//! ones but never writes anything; the [`crate::TransactionEngine`] does
//! that against the stored records.

use std::fmt;

use credits_types::{Initiator, ProgressionCategory, UserRecord};
use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Message key sent to the initiator when the directory write fails.
pub const FAILURE_MESSAGE_KEY: &str = "credits-transaction-failed";

// ---------------------------------------------------------------------------
// Kinds and failure reasons
// ---------------------------------------------------------------------------

/// What a transaction does to the target's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Increase the balance.
    Add,
    /// Replace the balance.
    Set,
    /// Decrease the balance.
    Take,
    /// Move credits from the initiating player to the target.
    Pay,
    /// Spend credits on levels in a progression category.
    Redeem(ProgressionCategory),
}

impl TransactionKind {
    /// Short lower-case name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Set => "set",
            Self::Take => "take",
            Self::Pay => "pay",
            Self::Redeem(_) => "redeem",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Redeem(category) => write!(f, "redeem into {category}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Why a transaction was rejected before it was announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The paying or redeeming record cannot cover the amount.
    InsufficientCredits,
    /// The progression category would exceed its level cap.
    CategoryCapped,
    /// The target's progression profile is not available.
    ProfileUnavailable,
    /// A player tried to pay themselves.
    SameUser,
    /// The resulting balance or counter would not fit.
    Overflow,
}

impl FailureReason {
    /// Message key the messaging layer renders for this reason.
    pub const fn message_key(self) -> &'static str {
        match self {
            Self::InsufficientCredits => "not-enough-credits",
            Self::CategoryCapped => "mcmmo-skill-cap",
            Self::ProfileUnavailable => "mcmmo-profile-fail",
            Self::SameUser => "credits-pay-same-user",
            Self::Overflow => "credits-overflow",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message_key())
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// The records a transaction produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// The target's record after the transaction.
    pub target: UserRecord,
    /// The payer's record after a [`TransactionKind::Pay`].
    pub payer: Option<UserRecord>,
}

/// One proposed balance mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    initiator: Initiator,
    target: UserRecord,
    kind: TransactionKind,
    amount: u32,
    payer: Option<UserRecord>,
}

impl Transaction {
    /// Start building a transaction of the given kind.
    pub const fn builder(kind: TransactionKind) -> TransactionBuilder {
        TransactionBuilder::new(kind)
    }

    /// Add `amount` credits to `target`.
    pub const fn add(initiator: Initiator, target: UserRecord, amount: u32) -> Self {
        Self::simple(initiator, target, TransactionKind::Add, amount)
    }

    /// Set `target`'s balance to `amount`.
    pub const fn set(initiator: Initiator, target: UserRecord, amount: u32) -> Self {
        Self::simple(initiator, target, TransactionKind::Set, amount)
    }

    /// Take `amount` credits from `target`.
    pub const fn take(initiator: Initiator, target: UserRecord, amount: u32) -> Self {
        Self::simple(initiator, target, TransactionKind::Take, amount)
    }

    /// Redeem `amount` of `target`'s credits into `category`.
    pub const fn redeem(
        initiator: Initiator,
        target: UserRecord,
        category: ProgressionCategory,
        amount: u32,
    ) -> Self {
        Self::simple(initiator, target, TransactionKind::Redeem(category), amount)
    }

    /// Move `amount` credits from `payer` to `target`. The payer is the
    /// initiator.
    pub const fn pay(payer: UserRecord, target: UserRecord, amount: u32) -> Self {
        Self {
            initiator: Initiator::Player(payer.id),
            target,
            kind: TransactionKind::Pay,
            amount,
            payer: Some(payer),
        }
    }

    const fn simple(
        initiator: Initiator,
        target: UserRecord,
        kind: TransactionKind,
        amount: u32,
    ) -> Self {
        Self {
            initiator,
            target,
            kind,
            amount,
            payer: None,
        }
    }

    /// Who asked for the mutation.
    pub const fn initiator(&self) -> Initiator {
        self.initiator
    }

    /// The record being changed, as it was when the transaction was built.
    pub const fn target(&self) -> &UserRecord {
        &self.target
    }

    /// The paying record of a [`TransactionKind::Pay`].
    pub const fn payer(&self) -> Option<&UserRecord> {
        self.payer.as_ref()
    }

    /// What the transaction does.
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Credits involved.
    pub const fn amount(&self) -> u32 {
        self.amount
    }

    /// Whether the initiator is acting on their own record.
    pub fn is_self_transaction(&self) -> bool {
        self.initiator.is(self.target.id)
    }

    /// Compute the records this transaction would write, applied to the
    /// records captured when it was built.
    ///
    /// Balance preconditions are checked here; progression preconditions
    /// are checked by the engine, which owns the progression collaborator.
    /// The engine re-applies the same rules to the stored records when it
    /// commits, so this is a preview.
    ///
    /// # Errors
    ///
    /// Returns the [`FailureReason`] if the transaction cannot apply.
    pub fn mutation(&self) -> Result<Mutation, FailureReason> {
        let Some(payer) = &self.payer else {
            if self.kind == TransactionKind::Pay {
                // A pay without a payer has nothing to pay with.
                return Err(FailureReason::InsufficientCredits);
            }
            return Ok(Self::single(self.target_after(&self.target)?));
        };
        if payer.id == self.target.id {
            return Err(FailureReason::SameUser);
        }
        let payer = self.payer_after(payer)?;
        Ok(Mutation {
            target: self.target_after(&self.target)?,
            payer: Some(payer),
        })
    }

    /// Apply this transaction's change to the target's `current` record.
    ///
    /// # Errors
    ///
    /// Returns [`FailureReason::InsufficientCredits`] if a take or redeem
    /// exceeds the balance, or [`FailureReason::Overflow`] if a counter
    /// would not fit.
    pub fn target_after(&self, current: &UserRecord) -> Result<UserRecord, FailureReason> {
        match self.kind {
            TransactionKind::Add | TransactionKind::Pay => {
                let credits = current.checked_add(self.amount).ok_or(FailureReason::Overflow)?;
                Ok(current.clone().with_credits(credits))
            }
            TransactionKind::Set => Ok(current.clone().with_credits(self.amount)),
            TransactionKind::Take => {
                let credits = current
                    .checked_take(self.amount)
                    .ok_or(FailureReason::InsufficientCredits)?;
                Ok(current.clone().with_credits(credits))
            }
            TransactionKind::Redeem(_) => {
                let credits = current
                    .checked_take(self.amount)
                    .ok_or(FailureReason::InsufficientCredits)?;
                let redeemed = current
                    .redeemed
                    .checked_add(self.amount)
                    .ok_or(FailureReason::Overflow)?;
                Ok(current
                    .clone()
                    .with_credits(credits)
                    .with_redeemed(redeemed))
            }
        }
    }

    /// Apply this transaction's debit to the payer's `current` record.
    ///
    /// # Errors
    ///
    /// Returns [`FailureReason::InsufficientCredits`] if the payer cannot
    /// cover the amount.
    pub fn payer_after(&self, current: &UserRecord) -> Result<UserRecord, FailureReason> {
        let credits = current
            .checked_take(self.amount)
            .ok_or(FailureReason::InsufficientCredits)?;
        Ok(current.clone().with_credits(credits))
    }

    const fn single(target: UserRecord) -> Mutation {
        Mutation {
            target,
            payer: None,
        }
    }

    /// Message key for the initiator's feedback.
    pub fn message_key(&self) -> &'static str {
        match self.kind {
            TransactionKind::Add => "credits-add",
            TransactionKind::Set => "credits-set",
            TransactionKind::Take => "credits-take",
            TransactionKind::Pay => "credits-pay",
            TransactionKind::Redeem(_) if self.is_self_transaction() => "credits-redeem",
            TransactionKind::Redeem(_) => "credits-redeem-sudo",
        }
    }

    /// Message key for the affected player's feedback.
    pub const fn user_message_key(&self) -> &'static str {
        match self.kind {
            TransactionKind::Add => "credits-add-user",
            TransactionKind::Set => "credits-set-user",
            TransactionKind::Take => "credits-take-user",
            TransactionKind::Pay => "credits-pay-user",
            TransactionKind::Redeem(_) => "credits-redeem-user",
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction builder
// ---------------------------------------------------------------------------

/// Builder for [`Transaction`] values assembled from parsed command or menu
/// input.
///
/// # Examples
///
/// ```
/// use credits_ledger::{TransactionBuilder, TransactionKind};
/// use credits_types::{Initiator, UserId, UserRecord};
///
/// let target = UserRecord::new(UserId::new(), "Steve").with_credits(10);
/// let tx = TransactionBuilder::new(TransactionKind::Take)
///     .initiator(Initiator::Console)
///     .target(target)
///     .amount(4)
///     .build()
///     .unwrap();
///
/// assert_eq!(tx.mutation().unwrap().target.credits, 6);
/// ```
#[derive(Debug)]
pub struct TransactionBuilder {
    kind: TransactionKind,
    initiator: Option<Initiator>,
    target: Option<UserRecord>,
    amount: Option<u32>,
    payer: Option<UserRecord>,
}

impl TransactionBuilder {
    /// Start building a transaction of the given kind.
    pub const fn new(kind: TransactionKind) -> Self {
        Self {
            kind,
            initiator: None,
            target: None,
            amount: None,
            payer: None,
        }
    }

    /// Set who is asking for the mutation.
    #[must_use]
    pub const fn initiator(mut self, initiator: Initiator) -> Self {
        self.initiator = Some(initiator);
        self
    }

    /// Set the record being changed.
    #[must_use]
    pub fn target(mut self, target: UserRecord) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the number of credits involved.
    #[must_use]
    pub const fn amount(mut self, amount: u32) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Set the paying record of a [`TransactionKind::Pay`]. The payer
    /// becomes the initiator.
    #[must_use]
    pub fn payer(mut self, payer: UserRecord) -> Self {
        self.initiator = Some(Initiator::Player(payer.id));
        self.payer = Some(payer);
        self
    }

    /// Validate inputs and produce a [`Transaction`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingField`] if a required field is unset,
    /// or [`LedgerError::UnexpectedField`] if a payer is given for a kind
    /// other than [`TransactionKind::Pay`].
    pub fn build(self) -> Result<Transaction, LedgerError> {
        let target = self.target.ok_or(LedgerError::MissingField("target"))?;
        let amount = self.amount.ok_or(LedgerError::MissingField("amount"))?;

        match (self.kind, self.payer) {
            (TransactionKind::Pay, Some(payer)) => Ok(Transaction::pay(payer, target, amount)),
            (TransactionKind::Pay, None) => Err(LedgerError::MissingField("payer")),
            (kind, Some(_)) => Err(LedgerError::UnexpectedField {
                field: "payer",
                kind: kind.name(),
            }),
            (kind, None) => {
                let initiator = self.initiator.ok_or(LedgerError::MissingField("initiator"))?;
                Ok(Transaction::simple(initiator, target, kind, amount))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use credits_types::UserId;

    use super::*;

    fn user(credits: u32) -> UserRecord {
        UserRecord::new(UserId::new(), "Steve").with_credits(credits)
    }

    #[test]
    fn take_within_balance_subtracts() {
        let tx = Transaction::take(Initiator::Console, user(100), 40);
        assert_eq!(tx.mutation().unwrap().target.credits, 60);

        let exact = Transaction::take(Initiator::Console, user(40), 40);
        assert_eq!(exact.mutation().unwrap().target.credits, 0);
    }

    #[test]
    fn take_beyond_balance_is_insufficient() {
        let tx = Transaction::take(Initiator::Console, user(10), 11);
        assert_eq!(tx.mutation(), Err(FailureReason::InsufficientCredits));
    }

    #[test]
    fn add_overflow_is_rejected() {
        let tx = Transaction::add(Initiator::Console, user(u32::MAX), 1);
        assert_eq!(tx.mutation(), Err(FailureReason::Overflow));
    }

    #[test]
    fn set_replaces_balance() {
        let tx = Transaction::set(Initiator::Console, user(7), 1_000);
        assert_eq!(tx.mutation().unwrap().target.credits, 1_000);
    }

    #[test]
    fn redeem_moves_credits_into_redeemed() {
        let target = user(50).with_redeemed(5);
        let tx = Transaction::redeem(
            Initiator::Player(target.id),
            target,
            ProgressionCategory::Mining,
            20,
        );
        let result = tx.mutation().unwrap().target;
        assert_eq!(result.credits, 30);
        assert_eq!(result.redeemed, 25);
        assert_eq!(tx.message_key(), "credits-redeem");
    }

    #[test]
    fn redeem_on_behalf_uses_sudo_key() {
        let tx = Transaction::redeem(Initiator::Console, user(50), ProgressionCategory::Mining, 1);
        assert_eq!(tx.message_key(), "credits-redeem-sudo");
        assert_eq!(tx.user_message_key(), "credits-redeem-user");
    }

    #[test]
    fn pay_moves_credits_between_records() {
        let payer = user(30);
        let target = user(5);
        let tx = Transaction::pay(payer.clone(), target, 10);
        let mutation = tx.mutation().unwrap();
        assert_eq!(mutation.target.credits, 15);
        assert_eq!(mutation.payer.unwrap().credits, 20);
        assert_eq!(tx.initiator(), Initiator::Player(payer.id));
    }

    #[test]
    fn pay_to_self_and_overdraw_are_rejected() {
        let payer = user(30);
        let to_self = Transaction::pay(payer.clone(), payer.clone(), 1);
        assert_eq!(to_self.mutation(), Err(FailureReason::SameUser));

        let overdraw = Transaction::pay(payer, user(0), 31);
        assert_eq!(overdraw.mutation(), Err(FailureReason::InsufficientCredits));
    }

    #[test]
    fn changes_apply_to_the_record_given() {
        let built_with = user(60);
        let current = built_with.clone().with_credits(20);
        let payee = user(0);

        let pay = Transaction::pay(built_with.clone(), payee.clone(), 50);
        assert!(pay.mutation().is_ok());
        assert_eq!(pay.payer_after(&current), Err(FailureReason::InsufficientCredits));
        assert_eq!(pay.target_after(&payee.with_credits(7)).unwrap().credits, 57);

        let add = Transaction::add(Initiator::Console, built_with, 5);
        assert_eq!(add.target_after(&current).unwrap().credits, 25);
    }

    #[test]
    fn builder_requires_fields() {
        let err = TransactionBuilder::new(TransactionKind::Add)
            .initiator(Initiator::Console)
            .amount(1)
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::MissingField("target")));

        let err = TransactionBuilder::new(TransactionKind::Pay)
            .target(user(1))
            .amount(1)
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::MissingField("payer")));

        let err = TransactionBuilder::new(TransactionKind::Add)
            .payer(user(1))
            .target(user(1))
            .amount(1)
            .build()
            .unwrap_err();
        assert!(matches!(err, LedgerError::UnexpectedField { field: "payer", .. }));
    }

    #[test]
    fn failure_reasons_serialize_snake_case() {
        let json = serde_json::to_string(&FailureReason::CategoryCapped).unwrap();
        assert_eq!(json, "\"category_capped\"");
        assert_eq!(FailureReason::CategoryCapped.message_key(), "mcmmo-skill-cap");
    }
}
