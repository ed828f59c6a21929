//! # Affliction Core
//!
//! Per-entity status effect validation and application.
//!
//! Every entity owns a [`StatusEngine`] that decides whether a candidate
//! status (Poison, Silence, Haste, ...) may be applied, given:
//!
//! - the entity's lifecycle state (dead entities accept only the revive status)
//! - temporary immunities recorded by collaborators
//! - the statuses already active on the entity
//! - the shared, static [`RuleGraph`] of blocking and override relations
//!
//! ## Architecture
//!
//! - **Rules** ([`affliction_rules`]): the immutable rule graph
//! - **Effects**: [`StatusEffect`] and the per-entity [`ActiveEffects`] set
//! - **Immunity**: [`ImmunityTracker`] with lazy expiry
//! - **Engine**: [`StatusEngine`] with `validate`, `apply` and the atomic
//!   `validate_and_apply`
//! - **Entities**: [`Entity`] as the engine's collaborator, [`Roster`] as the
//!   container that runs sweeps across all of them
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use affliction_core::{Entity, EntityId, StatusEffect, Stats, Timestamp};
//! use affliction_core::affliction_rules::{RuleGraph, StatusId};
//!
//! let rules = Arc::new(RuleGraph::standard());
//! let hero = Entity::new(EntityId::new(1), "Hero", Stats::new(80, 100, 30, 30), rules);
//!
//! let silence = StatusEffect::from_rules(hero.statuses().rules(), StatusId::SILENCE, Duration::from_secs(5));
//! hero.apply_status(silence, Timestamp::ZERO).unwrap();
//!
//! let haste = StatusEffect::from_rules(hero.statuses().rules(), StatusId::HASTE, Duration::from_secs(5));
//! let err = hero.apply_status(haste, Timestamp::from_secs(1)).unwrap_err();
//! assert_eq!(err.to_string(), "status conflict: silence blocks haste");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export the rule graph crate
pub use affliction_rules;

pub mod effect;
pub mod engine;
pub mod entity;
pub mod error;
pub mod immunity;
pub mod roster;
pub mod time;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use affliction_rules::{RuleGraph, StatusFlags, StatusId};
pub use effect::{ActiveEffects, ApplyOutcome, StatusEffect};
pub use engine::{Admission, StatusEngine, StatusTarget, TargetState};
pub use entity::{Entity, EntityId, EntitySnapshot, Position, Stats};
pub use error::{ConflictReason, EntityError, ErrorKind, StatusError};
pub use immunity::ImmunityTracker;
pub use roster::Roster;
pub use time::Timestamp;
