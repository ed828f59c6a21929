//! Active status effects and the per-entity effect set.
//!
//! # Invariants
//!
//! - [`ActiveEffects`] holds at most one entry per [`StatusId`]
//! - A refresh never shortens a stored duration
//! - A stack count never exceeds the effect's cap and never drops below 1

use std::collections::BTreeMap;
use std::time::Duration;

use affliction_rules::{RuleGraph, StatusFlags, StatusId, StatusSet};
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::EntityError;
use crate::time::Timestamp;

/// A timed condition on one entity, or a candidate for one.
///
/// Candidates are built with [`StatusEffect::new`] or
/// [`StatusEffect::from_rules`]; the start time is stamped when the effect
/// is actually inserted into an [`ActiveEffects`].
///
/// The source is an attribution-only reference to the entity that caused
/// the effect. The effect does not keep that entity alive.
///
/// # Example
///
/// ```
/// use affliction_core::effect::StatusEffect;
/// use affliction_core::entity::EntityId;
/// use affliction_rules::{StatusFlags, StatusId};
/// use std::time::Duration;
///
/// let candidate = StatusEffect::new(StatusId::POISON, Duration::from_secs(10))
///     .with_source(EntityId::new(7))
///     .with_flags(StatusFlags::REFRESHABLE | StatusFlags::STACKABLE)
///     .with_max_stacks(3);
///
/// assert_eq!(candidate.stacks(), 1);
/// assert!(candidate.flags().is_stackable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    id: StatusId,
    started_at: Timestamp,
    duration: Duration,
    stacks: u32,
    source: Option<EntityId>,
    flags: StatusFlags,
    max_stacks: u32,
}

impl StatusEffect {
    /// A single-stack candidate with no flags and no source.
    #[must_use]
    pub fn new(id: StatusId, duration: Duration) -> Self {
        Self {
            id,
            started_at: Timestamp::ZERO,
            duration,
            stacks: 1,
            source: None,
            flags: StatusFlags::empty(),
            max_stacks: 1,
        }
    }

    /// A candidate carrying the flags and stack cap the rule graph declares
    /// for `id`.
    #[must_use]
    pub fn from_rules(rules: &RuleGraph, id: StatusId, duration: Duration) -> Self {
        Self::new(id, duration)
            .with_flags(rules.flags(id))
            .with_max_stacks(rules.max_stacks(id))
    }

    /// Sets the attributed source entity.
    #[must_use]
    pub fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the application flags.
    #[must_use]
    pub fn with_flags(mut self, flags: StatusFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the stack cap. A cap of zero is treated as 1.
    #[must_use]
    pub fn with_max_stacks(mut self, max_stacks: u32) -> Self {
        self.max_stacks = max_stacks.max(1);
        self
    }

    /// Sets the start time.
    #[must_use]
    pub fn started(mut self, at: Timestamp) -> Self {
        self.started_at = at;
        self
    }

    /// Status identifier.
    #[must_use]
    pub const fn id(&self) -> StatusId {
        self.id
    }

    /// When the effect was inserted.
    #[must_use]
    pub const fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// How long the effect lasts from its start.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Current stack count (at least 1).
    #[must_use]
    pub const fn stacks(&self) -> u32 {
        self.stacks
    }

    /// The entity credited with this effect.
    #[must_use]
    pub const fn source(&self) -> Option<EntityId> {
        self.source
    }

    /// Application flags.
    #[must_use]
    pub const fn flags(&self) -> StatusFlags {
        self.flags
    }

    /// Stack cap.
    #[must_use]
    pub const fn max_stacks(&self) -> u32 {
        self.max_stacks
    }

    /// `started_at + duration`, saturating.
    #[must_use]
    pub fn expires_at(&self) -> Timestamp {
        self.started_at + self.duration
    }

    /// Returns `true` once `now` has reached the expiry.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at() <= now
    }

    /// Time left at `now`, zero once expired.
    #[must_use]
    pub fn remaining(&self, now: Timestamp) -> Duration {
        self.expires_at().saturating_duration_since(now)
    }

    /// Checks `1 <= stacks <= max_stacks`.
    ///
    /// Effects built through this module always pass; stored ones may not.
    ///
    /// # Errors
    ///
    /// [`EntityError::StacksOutOfBounds`].
    pub fn check_stacks(&self) -> Result<(), EntityError> {
        if self.stacks == 0 || self.stacks > self.max_stacks {
            return Err(EntityError::StacksOutOfBounds {
                id: self.id,
                stacks: self.stacks,
                max_stacks: self.max_stacks,
            });
        }
        Ok(())
    }

    /// Statuses that block this one, looked up in `rules`.
    #[must_use]
    pub fn blocked_by<'r>(&self, rules: &'r RuleGraph) -> &'r StatusSet {
        rules.blocked_by(self.id)
    }

    /// Statuses this one overrides, looked up in `rules`.
    #[must_use]
    pub fn overrides<'r>(&self, rules: &'r RuleGraph) -> &'r StatusSet {
        rules.overrides(self.id)
    }

    /// Extends the duration to `max(current, duration)` and, if stackable,
    /// adds one stack up to the cap.
    fn refresh(&mut self, duration: Duration) {
        self.duration = self.duration.max(duration);
        if self.flags.is_stackable() {
            self.stacks = self.stacks.saturating_add(1).min(self.max_stacks);
        }
    }
}

/// What an application did to the effect set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplyOutcome {
    /// A new entry was created.
    Inserted,
    /// An existing entry was refreshed in place.
    Refreshed {
        /// Stored duration after the refresh.
        duration: Duration,
        /// Stack count after the refresh.
        stacks: u32,
    },
    /// An entry was removed.
    Removed,
    /// Removal of a status that was not active; nothing happened.
    Unchanged,
}

/// The statuses currently active on one entity, keyed by identifier.
///
/// Iteration is in ascending identifier order so that conflict reports and
/// sweeps are deterministic. On the wire the set is a plain list, and
/// deserialization goes through [`ActiveEffects::from_effects`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StatusEffect>", into = "Vec<StatusEffect>")]
pub struct ActiveEffects {
    effects: BTreeMap<StatusId, StatusEffect>,
}

impl ActiveEffects {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            effects: BTreeMap::new(),
        }
    }

    /// Builds a set from a stored status list, rejecting duplicates and
    /// out-of-range stack counts.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::StacksOutOfBounds`] or
    /// [`EntityError::DuplicateStatus`] for the first offending effect.
    pub fn from_effects<I>(effects: I) -> Result<Self, EntityError>
    where
        I: IntoIterator<Item = StatusEffect>,
    {
        let mut set = Self::new();
        for effect in effects {
            effect.check_stacks()?;
            let id = effect.id();
            if set.effects.insert(id, effect).is_some() {
                return Err(EntityError::DuplicateStatus { id });
            }
        }
        Ok(set)
    }

    /// Returns the effect for `id`, if active.
    #[must_use]
    pub fn get(&self, id: StatusId) -> Option<&StatusEffect> {
        self.effects.get(&id)
    }

    /// Returns `true` if `id` is active.
    #[must_use]
    pub fn contains(&self, id: StatusId) -> bool {
        self.effects.contains_key(&id)
    }

    /// Active identifiers in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = StatusId> + '_ {
        self.effects.keys().copied()
    }

    /// Active effects in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.values()
    }

    /// Number of active effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Returns `true` if nothing is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Inserts `candidate` started at `now`, or refreshes the existing entry
    /// with the candidate's duration.
    ///
    /// A refresh keeps the existing entry's start time, source, flags and
    /// cap; only duration and stacks move.
    pub fn activate(&mut self, candidate: StatusEffect, now: Timestamp) -> ApplyOutcome {
        if let Some(existing) = self.effects.get_mut(&candidate.id) {
            existing.refresh(candidate.duration);
            return ApplyOutcome::Refreshed {
                duration: existing.duration,
                stacks: existing.stacks,
            };
        }

        let effect = StatusEffect {
            started_at: now,
            stacks: 1,
            ..candidate
        };
        self.effects.insert(effect.id, effect);
        ApplyOutcome::Inserted
    }

    /// Removes the entry for `id`. Removing an absent identifier is a no-op.
    pub fn remove(&mut self, id: StatusId) -> ApplyOutcome {
        match self.effects.remove(&id) {
            Some(_) => ApplyOutcome::Removed,
            None => ApplyOutcome::Unchanged,
        }
    }

    /// Removes every effect expired at `now`, returning their identifiers in
    /// ascending order.
    pub fn remove_expired(&mut self, now: Timestamp) -> Vec<StatusId> {
        let expired: Vec<StatusId> = self
            .effects
            .values()
            .filter(|effect| effect.is_expired(now))
            .map(StatusEffect::id)
            .collect();
        for id in &expired {
            self.effects.remove(id);
        }
        expired
    }
}

impl TryFrom<Vec<StatusEffect>> for ActiveEffects {
    type Error = EntityError;

    fn try_from(effects: Vec<StatusEffect>) -> Result<Self, Self::Error> {
        Self::from_effects(effects)
    }
}

impl From<ActiveEffects> for Vec<StatusEffect> {
    fn from(effects: ActiveEffects) -> Self {
        effects.effects.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    mod status_effect_tests {
        use super::*;

        #[test]
        fn new_defaults() {
            let effect = StatusEffect::new(StatusId::POISON, secs(10));
            assert_eq!(effect.id(), StatusId::POISON);
            assert_eq!(effect.stacks(), 1);
            assert_eq!(effect.max_stacks(), 1);
            assert_eq!(effect.source(), None);
            assert!(effect.flags().is_empty());
        }

        #[test]
        fn from_rules_copies_flags_and_cap() {
            let rules = RuleGraph::builder()
                .status(StatusId::POISON, StatusFlags::STACKABLE, 5)
                .build()
                .unwrap();
            let effect = StatusEffect::from_rules(&rules, StatusId::POISON, secs(3));
            assert_eq!(effect.flags(), StatusFlags::STACKABLE);
            assert_eq!(effect.max_stacks(), 5);
        }

        #[test]
        fn zero_cap_is_raised_to_one() {
            let effect = StatusEffect::new(StatusId::POISON, secs(1)).with_max_stacks(0);
            assert_eq!(effect.max_stacks(), 1);
        }

        #[test]
        fn expiry_arithmetic() {
            let effect =
                StatusEffect::new(StatusId::POISON, secs(10)).started(Timestamp::from_secs(5));
            assert_eq!(effect.expires_at(), Timestamp::from_secs(15));
            assert!(!effect.is_expired(Timestamp::from_secs(14)));
            assert!(effect.is_expired(Timestamp::from_secs(15)));
            assert_eq!(effect.remaining(Timestamp::from_secs(12)), secs(3));
            assert_eq!(effect.remaining(Timestamp::from_secs(20)), Duration::ZERO);
        }

        #[test]
        fn derived_sets_come_from_the_graph() {
            let rules = RuleGraph::standard();
            let haste = StatusEffect::new(StatusId::HASTE, secs(1));
            assert!(haste.blocked_by(&rules).contains(StatusId::SILENCE));
            assert!(haste.overrides(&rules).is_empty());
        }
    }

    mod active_effects_tests {
        use super::*;

        #[test]
        fn activate_inserts_with_start_time() {
            let mut effects = ActiveEffects::new();
            let outcome = effects.activate(
                StatusEffect::new(StatusId::POISON, secs(10)),
                Timestamp::from_secs(3),
            );

            assert_eq!(outcome, ApplyOutcome::Inserted);
            let stored = effects.get(StatusId::POISON).unwrap();
            assert_eq!(stored.started_at(), Timestamp::from_secs(3));
            assert_eq!(stored.stacks(), 1);
        }

        #[test]
        fn refresh_never_shortens() {
            let mut effects = ActiveEffects::new();
            effects.activate(
                StatusEffect::new(StatusId::POISON, secs(10)),
                Timestamp::ZERO,
            );
            let outcome = effects.activate(
                StatusEffect::new(StatusId::POISON, secs(5)),
                Timestamp::from_secs(1),
            );

            assert_eq!(
                outcome,
                ApplyOutcome::Refreshed {
                    duration: secs(10),
                    stacks: 1
                }
            );
            assert_eq!(effects.len(), 1);
            assert_eq!(
                effects.get(StatusId::POISON).unwrap().started_at(),
                Timestamp::ZERO
            );
        }

        #[test]
        fn refresh_extends() {
            let mut effects = ActiveEffects::new();
            effects.activate(StatusEffect::new(StatusId::POISON, secs(5)), Timestamp::ZERO);
            effects.activate(StatusEffect::new(StatusId::POISON, secs(8)), Timestamp::ZERO);
            assert_eq!(effects.get(StatusId::POISON).unwrap().duration(), secs(8));
        }

        #[test]
        fn stacks_clamp_at_cap() {
            let mut effects = ActiveEffects::new();
            let candidate = StatusEffect::new(StatusId::POISON, secs(5))
                .with_flags(StatusFlags::REFRESHABLE | StatusFlags::STACKABLE)
                .with_max_stacks(3);

            for _ in 0..10 {
                effects.activate(candidate.clone(), Timestamp::ZERO);
            }
            assert_eq!(effects.get(StatusId::POISON).unwrap().stacks(), 3);
        }

        #[test]
        fn non_stackable_refresh_keeps_one_stack() {
            let mut effects = ActiveEffects::new();
            let candidate = StatusEffect::new(StatusId::POISON, secs(5))
                .with_flags(StatusFlags::REFRESHABLE)
                .with_max_stacks(3);
            effects.activate(candidate.clone(), Timestamp::ZERO);
            effects.activate(candidate, Timestamp::ZERO);
            assert_eq!(effects.get(StatusId::POISON).unwrap().stacks(), 1);
        }

        #[test]
        fn remove_is_idempotent() {
            let mut effects = ActiveEffects::new();
            effects.activate(StatusEffect::new(StatusId::POISON, secs(5)), Timestamp::ZERO);

            assert_eq!(effects.remove(StatusId::POISON), ApplyOutcome::Removed);
            assert_eq!(effects.remove(StatusId::POISON), ApplyOutcome::Unchanged);
            assert!(effects.is_empty());
        }

        #[test]
        fn remove_expired_in_id_order() {
            let mut effects = ActiveEffects::new();
            effects.activate(StatusEffect::new(StatusId::HASTE, secs(1)), Timestamp::ZERO);
            effects.activate(StatusEffect::new(StatusId::POISON, secs(2)), Timestamp::ZERO);
            effects.activate(StatusEffect::new(StatusId::SILENCE, secs(60)), Timestamp::ZERO);

            let expired = effects.remove_expired(Timestamp::from_secs(2));
            assert_eq!(expired, vec![StatusId::POISON, StatusId::HASTE]);
            assert_eq!(effects.ids().collect::<Vec<_>>(), vec![StatusId::SILENCE]);
        }

        #[test]
        fn from_effects_rejects_duplicates() {
            let err = ActiveEffects::from_effects(vec![
                StatusEffect::new(StatusId::POISON, secs(1)),
                StatusEffect::new(StatusId::SILENCE, secs(1)),
                StatusEffect::new(StatusId::POISON, secs(2)),
            ])
            .unwrap_err();
            assert_eq!(err, EntityError::DuplicateStatus { id: StatusId::POISON });
        }

        #[test]
        fn serialization_roundtrip() {
            let mut effects = ActiveEffects::new();
            effects.activate(
                StatusEffect::new(StatusId::POISON, secs(5)).with_source(EntityId::new(9)),
                Timestamp::from_secs(1),
            );
            let json = serde_json::to_string(&effects).unwrap();
            let back: ActiveEffects = serde_json::from_str(&json).unwrap();
            assert_eq!(effects, back);
        }

        fn with_stacks(effect: &StatusEffect, stacks: u32) -> StatusEffect {
            let mut value = serde_json::to_value(effect).unwrap();
            value["stacks"] = serde_json::json!(stacks);
            serde_json::from_value(value).unwrap()
        }

        #[test]
        fn from_effects_rejects_stacks_out_of_range() {
            let poison = StatusEffect::new(StatusId::POISON, secs(5));

            let over = with_stacks(&poison, 50);
            assert_eq!(
                ActiveEffects::from_effects(vec![over]).unwrap_err(),
                EntityError::StacksOutOfBounds {
                    id: StatusId::POISON,
                    stacks: 50,
                    max_stacks: 1
                }
            );

            let zero = with_stacks(&poison, 0);
            assert!(matches!(
                ActiveEffects::from_effects(vec![zero]),
                Err(EntityError::StacksOutOfBounds { stacks: 0, .. })
            ));
        }

        #[test]
        fn deserialization_checks_stored_effects() {
            let poison = StatusEffect::new(StatusId::POISON, secs(5));
            let json = serde_json::to_string(&vec![poison.clone(), poison]).unwrap();
            let err = serde_json::from_str::<ActiveEffects>(&json).unwrap_err();
            assert!(err.to_string().contains("duplicate status poison"), "{err}");

            let json = serde_json::to_string(&vec![with_stacks(
                &StatusEffect::new(StatusId::HASTE, secs(5)),
                7,
            )])
            .unwrap();
            let err = serde_json::from_str::<ActiveEffects>(&json).unwrap_err();
            assert!(err.to_string().contains("haste has 7 stacks"), "{err}");
        }
    }
}
