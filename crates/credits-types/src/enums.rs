//! Enumeration types shared across the workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// A skill-like counter in the external progression system that credits
/// can be redeemed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressionCategory {
    /// Fall damage mitigation.
    Acrobatics,
    /// Potion brewing.
    Alchemy,
    /// Bows.
    Archery,
    /// Axes.
    Axes,
    /// Crossbows.
    Crossbows,
    /// Digging.
    Excavation,
    /// Fishing.
    Fishing,
    /// Farming.
    Herbalism,
    /// Maces.
    Maces,
    /// Mining.
    Mining,
    /// Tool repair.
    Repair,
    /// Swords.
    Swords,
    /// Tamed animals.
    Taming,
    /// Tridents.
    Tridents,
    /// Fists.
    Unarmed,
    /// Tree felling.
    Woodcutting,
}

impl ProgressionCategory {
    /// Every category in declaration order.
    pub const ALL: [Self; 16] = [
        Self::Acrobatics,
        Self::Alchemy,
        Self::Archery,
        Self::Axes,
        Self::Crossbows,
        Self::Excavation,
        Self::Fishing,
        Self::Herbalism,
        Self::Maces,
        Self::Mining,
        Self::Repair,
        Self::Swords,
        Self::Taming,
        Self::Tridents,
        Self::Unarmed,
        Self::Woodcutting,
    ];

    /// Upper-case identifier used in configuration and messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Acrobatics => "ACROBATICS",
            Self::Alchemy => "ALCHEMY",
            Self::Archery => "ARCHERY",
            Self::Axes => "AXES",
            Self::Crossbows => "CROSSBOWS",
            Self::Excavation => "EXCAVATION",
            Self::Fishing => "FISHING",
            Self::Herbalism => "HERBALISM",
            Self::Maces => "MACES",
            Self::Mining => "MINING",
            Self::Repair => "REPAIR",
            Self::Swords => "SWORDS",
            Self::Taming => "TAMING",
            Self::Tridents => "TRIDENTS",
            Self::Unarmed => "UNARMED",
            Self::Woodcutting => "WOODCUTTING",
        }
    }
}

impl fmt::Display for ProgressionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known [`ProgressionCategory`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown progression category: {0}")]
pub struct ParseCategoryError(pub String);

impl FromStr for ProgressionCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseCategoryError(s.to_owned()))
    }
}

/// The actor that initiated a balance mutation.
///
/// Feedback for a mutation goes to the affected player and, separately, to
/// the initiator. When a player acts on their own account both roles are
/// the same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Initiator {
    /// The server console or an automated task.
    Console,
    /// A connected player.
    Player(UserId),
}

impl Initiator {
    /// The initiating player's identity, if a player initiated.
    pub const fn user_id(self) -> Option<UserId> {
        match self {
            Self::Console => None,
            Self::Player(id) => Some(id),
        }
    }

    /// Whether this initiator is the given player.
    pub fn is(self, id: UserId) -> bool {
        self.user_id() == Some(id)
    }
}

impl fmt::Display for Initiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Console => f.write_str("console"),
            Self::Player(id) => write!(f, "player {id}"),
        }
    }
}
