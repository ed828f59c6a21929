//! The per-entity status engine.
//!
//! A [`StatusEngine`] owns one entity's [`ActiveEffects`] and
//! [`ImmunityTracker`] behind a single reader/writer lock and decides whether
//! a candidate status may be applied.
//!
//! # Operations
//!
//! - [`StatusEngine::validate`]: read-only conflict check under the read lock
//! - [`StatusEngine::apply`]: mutation under the write lock; re-checks
//!   immunity but not the rule graph
//! - [`StatusEngine::validate_and_apply`]: both phases under one write lock
//!
//! # Check-then-act
//!
//! `validate` followed by `apply` is two lock acquisitions. Another caller's
//! `apply` can land in between and invalidate the decision. Callers that use
//! the split form must serialize status requests per entity themselves;
//! everyone else should call [`StatusEngine::validate_and_apply`].
//!
//! # Decision order
//!
//! Validation short-circuits on the first rule that fires:
//!
//! 1. Dead target, candidate is not the revive status → `TargetStateInvalid`
//! 2. Immunity in force → `Immune`
//! 3. Same status already active: not refreshable → `Exists`; different
//!    source and candidate not stackable → `Conflict(DifferentSource)`;
//!    otherwise admitted as a refresh
//! 4. For each other active status `A`, ascending:
//!    `A` blocks the candidate → `Conflict(BlockedBy)`;
//!    the candidate is in `A`'s overrides set → `Conflict(Overrides)`
//! 5. Accept

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use affliction_rules::{RuleGraph, StatusId};
use tracing::{debug, trace, warn};

use crate::effect::{ActiveEffects, ApplyOutcome, StatusEffect};
use crate::entity::EntityId;
use crate::error::{ConflictReason, StatusError};
use crate::immunity::ImmunityTracker;
use crate::time::Timestamp;

/// What the engine needs to know about the entity a status is aimed at.
pub trait StatusTarget {
    /// Identity, used for attribution in errors and logs.
    fn entity_id(&self) -> EntityId;

    /// Whether the entity is dead.
    fn is_dead(&self) -> bool;
}

/// A bare identity/liveness pair for callers that do not hold a full
/// [`Entity`](crate::entity::Entity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetState {
    /// Entity identity.
    pub id: EntityId,
    /// Whether the entity is dead.
    pub dead: bool,
}

impl TargetState {
    /// A living target.
    #[must_use]
    pub const fn alive(id: EntityId) -> Self {
        Self { id, dead: false }
    }

    /// A dead target.
    #[must_use]
    pub const fn dead(id: EntityId) -> Self {
        Self { id, dead: true }
    }
}

impl StatusTarget for TargetState {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn is_dead(&self) -> bool {
        self.dead
    }
}

/// How a validated candidate would land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Admission {
    /// No entry exists yet; a new one would be inserted.
    Insert,
    /// An entry exists and would be refreshed in place.
    Refresh,
}

/// Everything guarded by the entity's status lock.
#[derive(Debug, Default)]
struct StatusState {
    effects: ActiveEffects,
    immunity: ImmunityTracker,
}

impl StatusState {
    fn admit<T: StatusTarget + ?Sized>(
        &self,
        rules: &RuleGraph,
        target: &T,
        candidate: &StatusEffect,
        now: Timestamp,
    ) -> Result<Admission, StatusError> {
        let id = candidate.id();

        if target.is_dead() && id != rules.revive() {
            return Err(StatusError::TargetStateInvalid {
                target: target.entity_id(),
                id,
            });
        }

        if let Some(until) = self.immunity.active_until(id, now) {
            return Err(StatusError::Immune { id, until });
        }

        let mut admission = Admission::Insert;
        if let Some(existing) = self.effects.get(id) {
            if !existing.flags().is_refreshable() {
                return Err(StatusError::Exists { id });
            }
            if existing.source() != candidate.source() && !candidate.flags().is_stackable() {
                return Err(StatusError::Conflict {
                    candidate: id,
                    conflicting: id,
                    reason: ConflictReason::DifferentSource,
                });
            }
            admission = Admission::Refresh;
        }

        let blocked_by = rules.blocked_by(id);
        for active in self.effects.ids().filter(|&active| active != id) {
            if blocked_by.contains(active) {
                return Err(StatusError::Conflict {
                    candidate: id,
                    conflicting: active,
                    reason: ConflictReason::BlockedBy,
                });
            }
            // Rejects the candidate when an active status lists it as
            // overridden. Kept as-is until the intended override policy is
            // confirmed; see `overrides_direction_rejects_candidate`.
            if rules.overrides(active).contains(id) {
                return Err(StatusError::Conflict {
                    candidate: id,
                    conflicting: active,
                    reason: ConflictReason::Overrides,
                });
            }
        }

        Ok(admission)
    }
}

/// Status validation and application for one entity.
///
/// One engine exists per entity, is created with it and dropped with it.
/// The rule graph is shared between all engines.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use affliction_core::effect::{ApplyOutcome, StatusEffect};
/// use affliction_core::engine::{StatusEngine, TargetState};
/// use affliction_core::entity::EntityId;
/// use affliction_core::time::Timestamp;
/// use affliction_rules::{RuleGraph, StatusId};
///
/// let rules = Arc::new(RuleGraph::standard());
/// let id = EntityId::new(1);
/// let engine = StatusEngine::new(id, Arc::clone(&rules));
///
/// let silence = StatusEffect::from_rules(&rules, StatusId::SILENCE, Duration::from_secs(5));
/// let outcome = engine
///     .validate_and_apply(&TargetState::alive(id), silence, Timestamp::ZERO)
///     .unwrap();
/// assert_eq!(outcome, ApplyOutcome::Inserted);
///
/// // Silence blocks Haste in the standard rules.
/// let haste = StatusEffect::from_rules(&rules, StatusId::HASTE, Duration::from_secs(5));
/// assert!(engine.validate(&TargetState::alive(id), &haste, Timestamp::ZERO).is_err());
/// ```
#[derive(Debug)]
pub struct StatusEngine {
    owner: EntityId,
    rules: Arc<RuleGraph>,
    state: RwLock<StatusState>,
}

impl StatusEngine {
    /// Creates an engine with no active effects and no immunities.
    #[must_use]
    pub fn new(owner: EntityId, rules: Arc<RuleGraph>) -> Self {
        Self::restore(owner, rules, ActiveEffects::new(), ImmunityTracker::new())
    }

    /// Creates an engine from previously stored state.
    ///
    /// Uniqueness of the effect set is guaranteed by [`ActiveEffects`]
    /// itself; build it with [`ActiveEffects::from_effects`] to check a raw
    /// status list.
    #[must_use]
    pub fn restore(
        owner: EntityId,
        rules: Arc<RuleGraph>,
        effects: ActiveEffects,
        immunity: ImmunityTracker,
    ) -> Self {
        Self {
            owner,
            rules,
            state: RwLock::new(StatusState { effects, immunity }),
        }
    }

    /// The entity this engine belongs to.
    #[must_use]
    pub const fn owner(&self) -> EntityId {
        self.owner
    }

    /// The shared rule graph.
    #[must_use]
    pub fn rules(&self) -> &Arc<RuleGraph> {
        &self.rules
    }

    fn debug_assert_owner<T: StatusTarget + ?Sized>(&self, target: &T) {
        debug_assert_eq!(
            target.entity_id(),
            self.owner,
            "status target is not the engine's owner"
        );
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, StatusState>, StatusError> {
        self.state.read().map_err(|_| {
            warn!(entity = %self.owner, "status state lock poisoned");
            StatusError::LockPoisoned
        })
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, StatusState>, StatusError> {
        self.state.write().map_err(|_| {
            warn!(entity = %self.owner, "status state lock poisoned");
            StatusError::LockPoisoned
        })
    }

    /// Checks whether `candidate` may be applied to `target` at `now`.
    ///
    /// Holds the read lock for the whole decision, so all steps see one
    /// consistent snapshot. Performs no mutation.
    ///
    /// `target` must be the entity this engine belongs to; debug builds
    /// assert it.
    ///
    /// # Errors
    ///
    /// Returns the first rule violation found (see the module docs for the
    /// order), or [`StatusError::LockPoisoned`].
    pub fn validate<T: StatusTarget + ?Sized>(
        &self,
        target: &T,
        candidate: &StatusEffect,
        now: Timestamp,
    ) -> Result<Admission, StatusError> {
        self.debug_assert_owner(target);
        let state = self.read_state()?;
        let result = state.admit(&self.rules, target, candidate, now);
        drop(state);

        match &result {
            Ok(admission) => trace!(
                entity = %target.entity_id(),
                status = %candidate.id(),
                ?admission,
                "status admitted"
            ),
            Err(error) => debug!(
                entity = %target.entity_id(),
                status = %candidate.id(),
                %error,
                "status rejected"
            ),
        }
        result
    }

    /// Activates or removes `id`.
    ///
    /// Does not consult the rule graph's blocking or override sets; that is
    /// [`validate`](Self::validate)'s job. It does enforce immunity (for both
    /// activation and removal) and duration monotonicity on refresh. New
    /// entries take their flags and stack cap from the rule graph and carry
    /// no source.
    ///
    /// # Errors
    ///
    /// [`StatusError::Immune`] if immunity to `id` is in force at `now`, or
    /// [`StatusError::LockPoisoned`].
    pub fn apply(
        &self,
        id: StatusId,
        active: bool,
        duration: Duration,
        now: Timestamp,
    ) -> Result<ApplyOutcome, StatusError> {
        let mut state = self.write_state()?;

        if let Some(until) = state.immunity.active_until(id, now) {
            debug!(entity = %self.owner, status = %id, %until, "apply refused: immune");
            return Err(StatusError::Immune { id, until });
        }

        let outcome = if active {
            let candidate = StatusEffect::from_rules(&self.rules, id, duration);
            state.effects.activate(candidate, now)
        } else {
            state.effects.remove(id)
        };
        drop(state);

        debug!(entity = %self.owner, status = %id, ?outcome, "status applied");
        Ok(outcome)
    }

    /// Removes `id` if active. Shorthand for `apply(id, false, ZERO, now)`.
    ///
    /// # Errors
    ///
    /// Same as [`apply`](Self::apply).
    pub fn remove(&self, id: StatusId, now: Timestamp) -> Result<ApplyOutcome, StatusError> {
        self.apply(id, false, Duration::ZERO, now)
    }

    /// Validates `candidate` and activates it under a single write lock.
    ///
    /// This is the race-free entry point: no other caller can change the
    /// effect set or immunities between the decision and the mutation.
    /// New entries keep the candidate's own source, flags and stack cap.
    /// The same owner requirement as [`validate`](Self::validate) applies.
    ///
    /// # Errors
    ///
    /// Any error [`validate`](Self::validate) can return.
    pub fn validate_and_apply<T: StatusTarget + ?Sized>(
        &self,
        target: &T,
        candidate: StatusEffect,
        now: Timestamp,
    ) -> Result<ApplyOutcome, StatusError> {
        self.debug_assert_owner(target);
        let mut state = self.write_state()?;

        if let Err(error) = state.admit(&self.rules, target, &candidate, now) {
            debug!(
                entity = %target.entity_id(),
                status = %candidate.id(),
                %error,
                "status rejected"
            );
            return Err(error);
        }

        let id = candidate.id();
        let outcome = state.effects.activate(candidate, now);
        drop(state);

        debug!(entity = %target.entity_id(), status = %id, ?outcome, "status applied");
        Ok(outcome)
    }

    /// Installs or extends immunity to `id` until `until`.
    ///
    /// Called by collaborators (for example when certain statuses wear off);
    /// the engine never grants immunity on its own. Returns the effective
    /// expiry.
    ///
    /// # Errors
    ///
    /// [`StatusError::LockPoisoned`].
    pub fn grant_immunity(&self, id: StatusId, until: Timestamp) -> Result<Timestamp, StatusError> {
        let effective = self.write_state()?.immunity.grant(id, until);
        debug!(entity = %self.owner, status = %id, until = %effective, "immunity granted");
        Ok(effective)
    }

    /// Drops any immunity to `id`, returning `true` if one was recorded.
    ///
    /// # Errors
    ///
    /// [`StatusError::LockPoisoned`].
    pub fn revoke_immunity(&self, id: StatusId) -> Result<bool, StatusError> {
        Ok(self.write_state()?.immunity.revoke(id))
    }

    /// Returns `true` if immunity to `id` is in force at `now`.
    ///
    /// # Errors
    ///
    /// [`StatusError::LockPoisoned`].
    pub fn is_immune(&self, id: StatusId, now: Timestamp) -> Result<bool, StatusError> {
        Ok(self.read_state()?.immunity.is_immune(id, now))
    }

    /// Removes effects whose `start + duration` has passed and lapsed
    /// immunity records. Returns the removed statuses in ascending order.
    ///
    /// # Errors
    ///
    /// [`StatusError::LockPoisoned`].
    pub fn sweep_expired(&self, now: Timestamp) -> Result<Vec<StatusId>, StatusError> {
        let mut state = self.write_state()?;
        let expired = state.effects.remove_expired(now);
        let lapsed = state.immunity.purge_expired(now);
        drop(state);

        if !expired.is_empty() || lapsed > 0 {
            debug!(
                entity = %self.owner,
                expired = ?expired,
                lapsed_immunities = lapsed,
                "expired statuses swept"
            );
        }
        Ok(expired)
    }

    /// Snapshot of the active effects in ascending identifier order.
    ///
    /// # Errors
    ///
    /// [`StatusError::LockPoisoned`].
    pub fn effects(&self) -> Result<Vec<StatusEffect>, StatusError> {
        Ok(self.read_state()?.effects.iter().cloned().collect())
    }

    /// Copy of the effect for `id`, if active.
    ///
    /// # Errors
    ///
    /// [`StatusError::LockPoisoned`].
    pub fn effect(&self, id: StatusId) -> Result<Option<StatusEffect>, StatusError> {
        Ok(self.read_state()?.effects.get(id).cloned())
    }

    /// Copy of the immunity records, lapsed ones included until the next sweep.
    ///
    /// # Errors
    ///
    /// [`StatusError::LockPoisoned`].
    pub fn immunity(&self) -> Result<ImmunityTracker, StatusError> {
        Ok(self.read_state()?.immunity.clone())
    }

    /// Active identifiers in ascending order.
    ///
    /// # Errors
    ///
    /// [`StatusError::LockPoisoned`].
    pub fn active_ids(&self) -> Result<Vec<StatusId>, StatusError> {
        Ok(self.read_state()?.effects.ids().collect())
    }

    /// Returns `true` if `id` is active.
    ///
    /// # Errors
    ///
    /// [`StatusError::LockPoisoned`].
    pub fn contains(&self, id: StatusId) -> Result<bool, StatusError> {
        Ok(self.read_state()?.effects.contains(id))
    }

    /// Number of active effects.
    ///
    /// # Errors
    ///
    /// [`StatusError::LockPoisoned`].
    pub fn len(&self) -> Result<usize, StatusError> {
        Ok(self.read_state()?.effects.len())
    }

    /// Returns `true` if no effects are active.
    ///
    /// # Errors
    ///
    /// [`StatusError::LockPoisoned`].
    pub fn is_empty(&self) -> Result<bool, StatusError> {
        Ok(self.read_state()?.effects.is_empty())
    }
}
