//! The status rule graph.
//!
//! A [`RuleGraph`] maps each [`StatusId`] to a [`StatusRule`]: the statuses
//! that block it, the statuses it overrides, its application flags and its
//! stack cap. Lookups for identifiers the graph has never heard of return
//! empty sets and default flags, so callers never need to special-case
//! unknown statuses.
//!
//! # Invariants
//!
//! - No status blocks or overrides itself
//! - Every stack cap is at least 1
//! - The graph is never mutated after [`RuleGraphBuilder::build`]

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::error::RuleError;
use crate::flags::StatusFlags;
use crate::id::StatusId;
use crate::table::RuleTable;

/// A set of status identifiers with O(1) membership tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSet(HashSet<StatusId>);

impl StatusSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self(HashSet::new())
    }

    /// Returns `true` if `id` is a member.
    #[must_use]
    pub fn contains(&self, id: StatusId) -> bool {
        self.0.contains(&id)
    }

    /// Adds `id`, returning `true` if it was not already present.
    pub fn insert(&mut self, id: StatusId) -> bool {
        self.0.insert(id)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over members in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = StatusId> + '_ {
        self.0.iter().copied()
    }

    /// Returns the members sorted by identifier.
    #[must_use]
    pub fn sorted(&self) -> Vec<StatusId> {
        let mut ids: Vec<StatusId> = self.0.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl FromIterator<StatusId> for StatusSet {
    fn from_iter<I: IntoIterator<Item = StatusId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Rules attached to a single status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRule {
    blocked_by: StatusSet,
    overrides: StatusSet,
    flags: StatusFlags,
    max_stacks: u32,
}

impl StatusRule {
    /// Creates a rule with no relationships.
    #[must_use]
    pub fn new(flags: StatusFlags, max_stacks: u32) -> Self {
        Self {
            blocked_by: StatusSet::new(),
            overrides: StatusSet::new(),
            flags,
            max_stacks,
        }
    }

    /// Statuses whose presence prevents this one from being applied.
    #[must_use]
    pub fn blocked_by(&self) -> &StatusSet {
        &self.blocked_by
    }

    /// Statuses this one declares it overrides.
    #[must_use]
    pub fn overrides(&self) -> &StatusSet {
        &self.overrides
    }

    /// Application flags.
    #[must_use]
    pub const fn flags(&self) -> StatusFlags {
        self.flags
    }

    /// Stack cap (at least 1).
    #[must_use]
    pub const fn max_stacks(&self) -> u32 {
        self.max_stacks
    }
}

impl Default for StatusRule {
    fn default() -> Self {
        Self::new(StatusFlags::empty(), 1)
    }
}

/// Immutable blocking/override graph shared by every entity.
///
/// # Example
///
/// ```
/// use affliction_rules::{RuleGraph, StatusFlags, StatusId};
///
/// let graph = RuleGraph::standard();
///
/// assert!(graph.blocked_by(StatusId::HASTE).contains(StatusId::SILENCE));
/// assert!(graph.flags(StatusId::POISON).is_refreshable());
/// assert_eq!(graph.revive(), StatusId::REVIVE);
/// ```
#[derive(Debug, Clone)]
pub struct RuleGraph {
    rules: HashMap<StatusId, StatusRule>,
    revive: StatusId,
    empty: StatusSet,
}

impl RuleGraph {
    /// Starts building a graph.
    #[must_use]
    pub fn builder() -> RuleGraphBuilder {
        RuleGraphBuilder::new()
    }

    /// Builds a graph from a loaded rule table.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] if the table defines a status twice, gives a
    /// status a zero stack cap, or lets a status block or override itself.
    pub fn from_table(table: &RuleTable) -> Result<Self, RuleError> {
        let mut seen = HashSet::new();
        let mut builder = Self::builder().revive(table.revive);

        for entry in &table.statuses {
            if !seen.insert(entry.id) {
                return Err(RuleError::DuplicateRule { id: entry.id });
            }
            builder = builder.status(entry.id, entry.flags, entry.max_stacks);
            for &blocker in &entry.blocked_by {
                builder = builder.blocks(blocker, entry.id);
            }
            for &overridden in &entry.overrides {
                builder = builder.overrides(entry.id, overridden);
            }
        }

        builder.build()
    }

    /// The built-in rule set (see [`RuleTable::default`]).
    ///
    /// If the default table ever fails to build, the failure is logged at
    /// `warn` and an [`empty`](Self::empty) graph is returned.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_table(&RuleTable::default()).unwrap_or_else(|error| {
            warn!(%error, "default status rules failed to build; using empty graph");
            Self::empty()
        })
    }

    /// A graph with no rules and the default revive identifier.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
            revive: StatusId::REVIVE,
            empty: StatusSet::new(),
        }
    }

    /// Returns the statuses that block `id`. Empty for unknown identifiers.
    #[must_use]
    pub fn blocked_by(&self, id: StatusId) -> &StatusSet {
        self.rules.get(&id).map_or(&self.empty, StatusRule::blocked_by)
    }

    /// Returns the statuses `id` overrides. Empty for unknown identifiers.
    #[must_use]
    pub fn overrides(&self, id: StatusId) -> &StatusSet {
        self.rules.get(&id).map_or(&self.empty, StatusRule::overrides)
    }

    /// Returns the full rule for `id`, if one was declared.
    #[must_use]
    pub fn rule(&self, id: StatusId) -> Option<&StatusRule> {
        self.rules.get(&id)
    }

    /// Application flags for `id`. Empty for unknown identifiers.
    #[must_use]
    pub fn flags(&self, id: StatusId) -> StatusFlags {
        self.rules.get(&id).map_or(StatusFlags::empty(), StatusRule::flags)
    }

    /// Stack cap for `id`. 1 for unknown identifiers.
    #[must_use]
    pub fn max_stacks(&self, id: StatusId) -> u32 {
        self.rules.get(&id).map_or(1, StatusRule::max_stacks)
    }

    /// The status a dead target may still receive.
    #[must_use]
    pub const fn revive(&self) -> StatusId {
        self.revive
    }

    /// Number of statuses with declared rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no rules are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Declared status identifiers, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<StatusId> {
        let mut ids: Vec<StatusId> = self.rules.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for RuleGraph {
    fn default() -> Self {
        Self::standard()
    }
}

/// Incremental builder for [`RuleGraph`].
///
/// Relationships may mention statuses that were never declared with
/// [`status`](Self::status); those get a default rule (no flags, cap 1).
#[derive(Debug, Clone)]
pub struct RuleGraphBuilder {
    rules: HashMap<StatusId, StatusRule>,
    revive: StatusId,
}

impl RuleGraphBuilder {
    /// Creates an empty builder with [`StatusId::REVIVE`] as revive identifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
            revive: StatusId::REVIVE,
        }
    }

    /// Declares a status with its flags and stack cap, keeping any
    /// relationships already recorded for it.
    #[must_use]
    pub fn status(mut self, id: StatusId, flags: StatusFlags, max_stacks: u32) -> Self {
        let rule = self.rules.entry(id).or_default();
        rule.flags = flags;
        rule.max_stacks = max_stacks;
        self
    }

    /// Records that an active `blocker` prevents `blocked` from being applied.
    #[must_use]
    pub fn blocks(mut self, blocker: StatusId, blocked: StatusId) -> Self {
        self.rules
            .entry(blocked)
            .or_default()
            .blocked_by
            .insert(blocker);
        self
    }

    /// Records that `overrider` overrides `overridden`.
    #[must_use]
    pub fn overrides(mut self, overrider: StatusId, overridden: StatusId) -> Self {
        self.rules
            .entry(overrider)
            .or_default()
            .overrides
            .insert(overridden);
        self
    }

    /// Sets the status a dead target may still receive.
    #[must_use]
    pub fn revive(mut self, id: StatusId) -> Self {
        self.revive = id;
        self
    }

    /// Validates and freezes the graph.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::SelfReference`] if a status blocks or overrides
    /// itself, or [`RuleError::ZeroMaxStacks`] for a zero stack cap. Rules are
    /// checked in identifier order so the reported error is deterministic.
    pub fn build(self) -> Result<RuleGraph, RuleError> {
        let mut ids: Vec<StatusId> = self.rules.keys().copied().collect();
        ids.sort_unstable();

        for id in ids {
            let rule = &self.rules[&id];
            if rule.blocked_by.contains(id) {
                return Err(RuleError::SelfReference {
                    id,
                    relation: "block",
                });
            }
            if rule.overrides.contains(id) {
                return Err(RuleError::SelfReference {
                    id,
                    relation: "override",
                });
            }
            if rule.max_stacks == 0 {
                return Err(RuleError::ZeroMaxStacks { id });
            }
        }

        info!(
            statuses = self.rules.len(),
            revive = %self.revive,
            "status rule graph built"
        );

        Ok(RuleGraph {
            rules: self.rules,
            revive: self.revive,
            empty: StatusSet::new(),
        })
    }
}

impl Default for RuleGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
