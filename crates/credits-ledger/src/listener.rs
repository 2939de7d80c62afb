//! Announcement of proposed transactions to external listeners.
//!
//! Listeners run synchronously, in registration order, on the thread that
//! proposes the transaction. Each sees the same [`Announcement`] and may
//! cancel the transaction or suppress either side of its feedback.

use crate::transaction::{Mutation, Transaction};

/// A proposed transaction as seen by listeners.
#[derive(Debug)]
pub struct Announcement<'a> {
    transaction: &'a Transaction,
    mutation: &'a Mutation,
    cancelled: bool,
    notify_user: bool,
    notify_initiator: bool,
}

impl<'a> Announcement<'a> {
    pub(crate) const fn new(transaction: &'a Transaction, mutation: &'a Mutation) -> Self {
        Self {
            transaction,
            mutation,
            cancelled: false,
            notify_user: true,
            notify_initiator: true,
        }
    }

    /// The transaction being announced.
    pub const fn transaction(&self) -> &Transaction {
        self.transaction
    }

    /// The records the transaction will write if it is not cancelled.
    pub const fn mutation(&self) -> &Mutation {
        self.mutation
    }

    /// Veto the transaction. Nothing will be written.
    pub const fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Whether a listener has cancelled the transaction.
    pub const fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Do not notify the affected player.
    pub const fn silence_user(&mut self) {
        self.notify_user = false;
    }

    /// Do not notify the initiator.
    pub const fn silence_initiator(&mut self) {
        self.notify_initiator = false;
    }

    /// Whether the affected player will be notified.
    pub const fn notifies_user(&self) -> bool {
        self.notify_user
    }

    /// Whether the initiator will be notified.
    pub const fn notifies_initiator(&self) -> bool {
        self.notify_initiator
    }
}

/// Observer of proposed transactions.
pub trait TransactionListener: Send + Sync {
    /// Inspect, cancel, or silence a proposed transaction.
    fn on_announce(&self, announcement: &mut Announcement<'_>);
}

impl<F> TransactionListener for F
where
    F: Fn(&mut Announcement<'_>) + Send + Sync,
{
    fn on_announce(&self, announcement: &mut Announcement<'_>) {
        self(announcement);
    }
}
