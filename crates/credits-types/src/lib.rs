//! Shared type definitions for the mcMMO credits user data layer.
//!
//! Every crate in the workspace speaks in terms of the types defined here:
//! the player identity, the persisted user record, the progression
//! categories credits can be redeemed into, and the actor that initiates a
//! balance mutation.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrapper for player identities
//! - [`record`] -- The persisted [`UserRecord`] and display-name helpers
//! - [`enums`] -- Progression categories and transaction initiators

pub mod enums;
pub mod ids;
pub mod record;

pub use enums::{Initiator, ParseCategoryError, ProgressionCategory};
pub use ids::UserId;
pub use record::{UserRecord, name_key};
