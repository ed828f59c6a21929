//! Error types for the status engine and entity consistency checks.
//!
//! A rejected status application is an ordinary outcome, not a failure of
//! the process. Every variant here is returned to the immediate caller; the
//! engine swallows nothing except its documented no-ops (removing an absent
//! status, clamping stacks at the cap).

use affliction_rules::StatusId;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entity::EntityId;
use crate::time::Timestamp;

/// Why the rule graph (or the refresh rules) rejected a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConflictReason {
    /// The candidate is already active from another source and is not stackable.
    DifferentSource,
    /// An active status is in the candidate's blocked-by set.
    BlockedBy,
    /// The candidate is in an active status' overrides set.
    Overrides,
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DifferentSource => write!(f, "different source"),
            Self::BlockedBy => write!(f, "blocked by"),
            Self::Overrides => write!(f, "overrides"),
        }
    }
}

/// Coarse classification of a [`StatusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Target is in a lifecycle state that cannot take the status.
    TargetStateInvalid,
    /// Target is temporarily immune.
    StatusImmune,
    /// Status already active and not refreshable.
    StatusExists,
    /// Blocking/override/source rules reject the status.
    StatusConflict,
    /// Engine state is unusable (poisoned lock).
    Internal,
}

/// Errors returned by [`StatusEngine`](crate::engine::StatusEngine) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    /// The target is dead and the candidate is not the revive status.
    #[error("cannot apply {id} to entity {target}: target is dead")]
    TargetStateInvalid {
        /// The entity the status was aimed at.
        target: EntityId,
        /// The rejected status.
        id: StatusId,
    },

    /// The target is immune to this status until `until`.
    #[error("immune to {id} until {until}")]
    Immune {
        /// The blocked status.
        id: StatusId,
        /// When the immunity lapses.
        until: Timestamp,
    },

    /// The status is already active and cannot be refreshed.
    #[error("{id} is already active and not refreshable")]
    Exists {
        /// The already-active status.
        id: StatusId,
    },

    /// The rule graph or the source rules reject the candidate.
    #[error("status conflict: {}", conflict_message(.candidate, .conflicting, .reason))]
    Conflict {
        /// The rejected status.
        candidate: StatusId,
        /// The active status it conflicts with.
        conflicting: StatusId,
        /// Which rule fired.
        reason: ConflictReason,
    },

    /// A previous holder of the entity's status lock panicked.
    #[error("status state lock poisoned")]
    LockPoisoned,
}

fn conflict_message(candidate: &StatusId, conflicting: &StatusId, reason: &ConflictReason) -> String {
    match reason {
        ConflictReason::DifferentSource => {
            format!("{candidate} already active from a different source")
        }
        ConflictReason::BlockedBy => format!("{conflicting} blocks {candidate}"),
        ConflictReason::Overrides => format!("{candidate} overrides {conflicting}"),
    }
}

impl StatusError {
    /// Returns the coarse category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::TargetStateInvalid { .. } => ErrorKind::TargetStateInvalid,
            Self::Immune { .. } => ErrorKind::StatusImmune,
            Self::Exists { .. } => ErrorKind::StatusExists,
            Self::Conflict { .. } => ErrorKind::StatusConflict,
            Self::LockPoisoned => ErrorKind::Internal,
        }
    }

    /// The status this error is about, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusId> {
        match self {
            Self::TargetStateInvalid { id, .. }
            | Self::Immune { id, .. }
            | Self::Exists { id } => Some(*id),
            Self::Conflict { candidate, .. } => Some(*candidate),
            Self::LockPoisoned => None,
        }
    }
}

/// Entity-level consistency violations.
///
/// These come from the defensive sweep in
/// [`Entity::validate`](crate::entity::Entity::validate) and never gate a
/// status application.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityError {
    /// HP outside `[0, max_hp]`.
    #[error("invalid HP {hp}/{max_hp}")]
    HpOutOfBounds {
        /// Current HP.
        hp: i32,
        /// Maximum HP.
        max_hp: i32,
    },

    /// SP outside `[0, max_sp]`.
    #[error("invalid SP {sp}/{max_sp}")]
    SpOutOfBounds {
        /// Current SP.
        sp: i32,
        /// Maximum SP.
        max_sp: i32,
    },

    /// The same status appears more than once in a stored status list.
    #[error("duplicate status {id}")]
    DuplicateStatus {
        /// The duplicated status.
        id: StatusId,
    },

    /// A stored effect has a stack count outside `[1, max_stacks]`.
    #[error("{id} has {stacks} stacks, allowed 1..={max_stacks}")]
    StacksOutOfBounds {
        /// The offending status.
        id: StatusId,
        /// Stored stack count.
        stacks: u32,
        /// Stored stack cap.
        max_stacks: u32,
    },

    /// The entity's status list could not be read.
    #[error(transparent)]
    Status(#[from] StatusError),
}
