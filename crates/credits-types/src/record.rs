//! The persisted user record.
//!
//! A [`UserRecord`] is created the first time a player is seen (or by the
//! migration importer) and is never deleted during normal operation.
//! Balances are unsigned, so a negative credit balance is unrepresentable
//! in memory; the store additionally enforces it with a check constraint.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// One player's credit account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable platform identity.
    pub id: UserId,
    /// Current display name. Unique at any instant, not over time.
    pub name: String,
    /// Spendable credit balance.
    pub credits: u32,
    /// Total credits ever redeemed into progression categories.
    pub redeemed: u32,
}

impl UserRecord {
    /// A zero-balance record for a player seen for the first time.
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            credits: 0,
            redeemed: 0,
        }
    }

    /// Return a copy with the given credit balance.
    #[must_use]
    pub const fn with_credits(mut self, credits: u32) -> Self {
        self.credits = credits;
        self
    }

    /// Return a copy with the given redeemed counter.
    #[must_use]
    pub const fn with_redeemed(mut self, redeemed: u32) -> Self {
        self.redeemed = redeemed;
        self
    }

    /// Return a copy carrying a new display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Balance after adding `amount`, or `None` on overflow.
    pub const fn checked_add(&self, amount: u32) -> Option<u32> {
        self.credits.checked_add(amount)
    }

    /// Balance after removing `amount`, or `None` if it would go negative.
    pub const fn checked_take(&self, amount: u32) -> Option<u32> {
        self.credits.checked_sub(amount)
    }

    /// Case-folded display name used as the secondary lookup key.
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }
}

/// Normalize a display name for lookups.
///
/// Platform display names compare case-insensitively, so every name index
/// in the workspace is keyed by this form.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
