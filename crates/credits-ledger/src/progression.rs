//! The progression-system seam used by redemption.
//!
//! Redeeming credits grants levels in an external progression system.
//! The engine asks it whether a category can take more levels before
//! announcing a redemption, and grants the levels once the balance write
//! has succeeded.

use credits_types::{ProgressionCategory, UserId};

/// A player's standing in one progression category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryLevel {
    /// Current level.
    pub level: u32,
    /// Highest level the category allows.
    pub cap: u32,
}

impl CategoryLevel {
    /// Whether `levels` more would stay within the cap.
    pub const fn accepts(self, levels: u32) -> bool {
        match self.level.checked_add(levels) {
            Some(total) => total <= self.cap,
            None => false,
        }
    }
}

/// A progression system refused or failed to grant levels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("progression update failed for {user}: {reason}")]
pub struct ProgressionError {
    /// The player whose profile was being changed.
    pub user: UserId,
    /// What went wrong.
    pub reason: String,
}

/// External game-progression collaborator.
pub trait ProgressionSystem: Send + Sync {
    /// The player's standing in `category`, or `None` if their profile is
    /// not loaded.
    fn level(&self, user: UserId, category: ProgressionCategory) -> Option<CategoryLevel>;

    /// Grant `levels` in `category` and persist the profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressionError`] if the profile cannot be changed.
    fn add_levels(
        &self,
        user: UserId,
        category: ProgressionCategory,
        levels: u32,
    ) -> Result<(), ProgressionError>;
}
