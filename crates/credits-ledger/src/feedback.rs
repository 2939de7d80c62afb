//! The messaging seam.
//!
//! The engine decides whether feedback fires and to whom; turning a
//! [`Feedback`] into text is the [`Messenger`]'s job.

use credits_types::{Initiator, UserId, UserRecord};

use crate::transaction::TransactionKind;

/// Who a message is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// The server console.
    Console,
    /// A player.
    Player(UserId),
}

impl From<Initiator> for Recipient {
    fn from(initiator: Initiator) -> Self {
        match initiator {
            Initiator::Console => Self::Console,
            Initiator::Player(id) => Self::Player(id),
        }
    }
}

/// One message the engine wants delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    /// Who receives it.
    pub recipient: Recipient,
    /// Message template key.
    pub key: &'static str,
    /// The transaction kind that produced it.
    pub kind: TransactionKind,
    /// Credits involved.
    pub amount: u32,
    /// Who initiated the transaction.
    pub initiator: Initiator,
    /// The target's record after the transaction (or as it was, for error
    /// reports).
    pub target: UserRecord,
}

/// Renders and delivers feedback.
pub trait Messenger: Send + Sync {
    /// Deliver one message. Must not block.
    fn send(&self, feedback: Feedback);
}
