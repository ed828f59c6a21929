//! Entities that carry statuses.
//!
//! This module provides the collaborator side of the status engine:
//! - [`EntityId`]: Unique identifier for entities
//! - [`Position`], [`Stats`]: Plain attribute storage
//! - [`Inventory`]: Equipment slots and carried weight
//! - [`Entity`]: Identity, attributes, inventory and the entity's own
//!   [`StatusEngine`]
//! - [`EntitySnapshot`]: Serializable form of an entity
//!
//! # Ownership
//!
//! Each entity owns exactly one status engine, created with the entity and
//! dropped with it. The engine keeps the active effect set and immunities;
//! the entity supplies liveness and identity through [`StatusTarget`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use affliction_core::effect::StatusEffect;
//! use affliction_core::entity::{Entity, EntityId, Stats};
//! use affliction_core::time::Timestamp;
//! use affliction_rules::{RuleGraph, StatusId};
//!
//! let rules = Arc::new(RuleGraph::standard());
//! let entity = Entity::new(EntityId::new(42), "Poring", Stats::new(80, 100, 10, 10), rules);
//!
//! let poison = StatusEffect::from_rules(entity.statuses().rules(), StatusId::POISON, Duration::from_secs(10));
//! entity.apply_status(poison, Timestamp::ZERO).unwrap();
//!
//! assert!(entity.statuses().contains(StatusId::POISON).unwrap());
//! assert!(entity.validate().is_ok());
//! ```

pub mod inventory;

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use affliction_rules::RuleGraph;
use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::effect::{ActiveEffects, ApplyOutcome, StatusEffect};
use crate::engine::{StatusEngine, StatusTarget};
use crate::error::{EntityError, StatusError};
use crate::immunity::ImmunityTracker;
use crate::time::Timestamp;

pub use inventory::{EquipSlot, Inventory, InventoryError, Item};

/// Unique identifier for an entity.
///
/// `EntityId` is a newtype wrapper around `u64`. Entity IDs are immutable
/// once assigned and ordered by their numeric value, which gives
/// deterministic iteration wherever entities are kept in ordered maps.
///
/// # Example
///
/// ```
/// use affliction_core::entity::EntityId;
///
/// let id1 = EntityId::new(1);
/// let id2 = EntityId::new(2);
///
/// assert!(id1 < id2);
/// assert_eq!(id1.as_u64(), 1);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new `EntityId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// A cell on a named map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Cell coordinates.
    pub cell: IVec2,
    /// Map name.
    pub map: String,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub fn new(x: i32, y: i32, map: impl Into<String>) -> Self {
        Self {
            cell: IVec2::new(x, y),
            map: map.into(),
        }
    }

    /// Coordinates are non-negative.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.cell.x >= 0 && self.cell.y >= 0
    }

    /// Euclidean cell distance, or `None` if the positions are on different maps.
    #[must_use]
    pub fn distance(&self, to: &Self) -> Option<f32> {
        if self.map != to.map {
            return None;
        }
        Some(self.cell.as_vec2().distance(to.cell.as_vec2()))
    }
}

/// HP/SP bookkeeping.
///
/// Values are signed so that corrupted state is representable and caught by
/// [`Stats::validate`] rather than wrapping silently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stats {
    /// Current HP.
    pub hp: i32,
    /// Maximum HP.
    pub max_hp: i32,
    /// Current SP.
    pub sp: i32,
    /// Maximum SP.
    pub max_sp: i32,
}

impl Stats {
    /// Creates a stat block.
    #[must_use]
    pub const fn new(hp: i32, max_hp: i32, sp: i32, max_sp: i32) -> Self {
        Self {
            hp,
            max_hp,
            sp,
            max_sp,
        }
    }

    /// Checks HP within `[0, max_hp]` and SP within `[0, max_sp]`.
    ///
    /// # Errors
    ///
    /// [`EntityError::HpOutOfBounds`] or [`EntityError::SpOutOfBounds`].
    pub fn validate(&self) -> Result<(), EntityError> {
        if self.hp < 0 || self.hp > self.max_hp {
            return Err(EntityError::HpOutOfBounds {
                hp: self.hp,
                max_hp: self.max_hp,
            });
        }
        if self.sp < 0 || self.sp > self.max_sp {
            return Err(EntityError::SpOutOfBounds {
                sp: self.sp,
                max_sp: self.max_sp,
            });
        }
        Ok(())
    }
}

/// Rejects a status list with an out-of-range stack count or a status named twice.
fn check_statuses(statuses: &[StatusEffect]) -> Result<(), EntityError> {
    let mut seen = HashSet::with_capacity(statuses.len());
    for status in statuses {
        status.check_stacks()?;
        if !seen.insert(status.id()) {
            return Err(EntityError::DuplicateStatus { id: status.id() });
        }
    }
    Ok(())
}

/// Serializable form of an [`Entity`].
///
/// Snapshots can come from outside (a save file, a state sync), so their
/// status list is an unchecked `Vec`. [`EntitySnapshot::validate`] and
/// [`Entity::from_snapshot`] catch duplicates and bad stack counts. The
/// inventory re-derives its carried weight when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Entity identity.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Where the entity stands.
    #[serde(default)]
    pub position: Position,
    /// HP/SP.
    pub stats: Stats,
    /// Whether the entity is dead.
    #[serde(default)]
    pub dead: bool,
    /// Equipped items.
    #[serde(default)]
    pub inventory: Inventory,
    /// Active statuses.
    #[serde(default)]
    pub statuses: Vec<StatusEffect>,
    /// Immunity windows.
    #[serde(default)]
    pub immunity: ImmunityTracker,
}

impl EntitySnapshot {
    /// Checks HP/SP bounds, stack counts and status uniqueness.
    ///
    /// # Errors
    ///
    /// The first [`EntityError`] found.
    pub fn validate(&self) -> Result<(), EntityError> {
        self.stats.validate()?;
        check_statuses(&self.statuses)
    }
}

/// Attributes guarded together by the entity's attribute lock.
#[derive(Debug, Clone)]
struct Attributes {
    name: String,
    position: Position,
    stats: Stats,
    dead: bool,
}

/// A game entity with its own status engine.
///
/// All methods take `&self`; an `Entity` can be shared across threads
/// behind an `Arc`. Attribute reads recover from a poisoned lock, since the
/// attributes are plain values with no cross-field invariant a panic could
/// break halfway.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    attributes: RwLock<Attributes>,
    inventory: RwLock<Inventory>,
    statuses: StatusEngine,
}

impl Entity {
    /// Creates a living entity with no statuses and a default inventory.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, stats: Stats, rules: Arc<RuleGraph>) -> Self {
        Self {
            id,
            attributes: RwLock::new(Attributes {
                name: name.into(),
                position: Position::default(),
                stats,
                dead: false,
            }),
            inventory: RwLock::new(Inventory::default()),
            statuses: StatusEngine::new(id, rules),
        }
    }

    /// Rebuilds an entity from a snapshot after [`EntitySnapshot::validate`].
    ///
    /// # Errors
    ///
    /// The first [`EntityError`] the snapshot fails with.
    pub fn from_snapshot(snapshot: EntitySnapshot, rules: Arc<RuleGraph>) -> Result<Self, EntityError> {
        snapshot.validate()?;
        let effects = ActiveEffects::from_effects(snapshot.statuses)?;
        Ok(Self {
            id: snapshot.id,
            attributes: RwLock::new(Attributes {
                name: snapshot.name,
                position: snapshot.position,
                stats: snapshot.stats,
                dead: snapshot.dead,
            }),
            inventory: RwLock::new(snapshot.inventory),
            statuses: StatusEngine::restore(snapshot.id, rules, effects, snapshot.immunity),
        })
    }

    fn attributes(&self) -> RwLockReadGuard<'_, Attributes> {
        self.attributes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn attributes_mut(&self) -> RwLockWriteGuard<'_, Attributes> {
        self.attributes.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn inventory_mut(&self) -> RwLockWriteGuard<'_, Inventory> {
        self.inventory.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the entity's unique identifier.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> String {
        self.attributes().name.clone()
    }

    /// Renames the entity.
    pub fn set_name(&self, name: impl Into<String>) {
        self.attributes_mut().name = name.into();
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> Position {
        self.attributes().position.clone()
    }

    /// Moves the entity.
    pub fn set_position(&self, position: Position) {
        self.attributes_mut().position = position;
    }

    /// Current HP/SP.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.attributes().stats
    }

    /// Replaces HP/SP. Not validated; see [`Entity::validate`].
    pub fn set_stats(&self, stats: Stats) {
        self.attributes_mut().stats = stats;
    }

    /// Whether the entity is dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.attributes().dead
    }

    /// Marks the entity dead or alive.
    pub fn set_dead(&self, dead: bool) {
        self.attributes_mut().dead = dead;
    }

    /// The entity's status engine.
    #[must_use]
    pub const fn statuses(&self) -> &StatusEngine {
        &self.statuses
    }

    /// Validates and applies `candidate` to this entity atomically.
    ///
    /// # Errors
    ///
    /// Any [`StatusError`] from
    /// [`StatusEngine::validate_and_apply`].
    pub fn apply_status(&self, candidate: StatusEffect, now: Timestamp) -> Result<ApplyOutcome, StatusError> {
        self.statuses.validate_and_apply(self, candidate, now)
    }

    /// Copy of the inventory.
    #[must_use]
    pub fn inventory(&self) -> Inventory {
        self.inventory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Equips `item` into `slot`.
    ///
    /// # Errors
    ///
    /// Any [`InventoryError`] from [`Inventory::equip`].
    pub fn equip(&self, item: Item, slot: EquipSlot) -> Result<(), InventoryError> {
        self.inventory_mut().equip(item, slot)
    }

    /// Unequips whatever is in `slot`.
    ///
    /// # Errors
    ///
    /// [`InventoryError::SlotEmpty`].
    pub fn unequip(&self, slot: EquipSlot) -> Result<Item, InventoryError> {
        self.inventory_mut().unequip(slot)
    }

    /// Defensive consistency check: HP/SP bounds, stack counts and status
    /// uniqueness.
    ///
    /// Independent of the status engine's own rules; it exists to catch
    /// corruption from any code path.
    ///
    /// # Errors
    ///
    /// The first [`EntityError`] found, or [`EntityError::Status`] if the
    /// status list cannot be read.
    pub fn validate(&self) -> Result<(), EntityError> {
        self.stats().validate()?;
        let statuses = self.statuses.effects()?;
        check_statuses(&statuses)
    }

    /// Serializable copy of the entity.
    ///
    /// # Errors
    ///
    /// [`StatusError::LockPoisoned`] if the status state cannot be read.
    pub fn snapshot(&self) -> Result<EntitySnapshot, StatusError> {
        let statuses = self.statuses.effects()?;
        let immunity = self.statuses.immunity()?;
        let attributes = self.attributes().clone();
        Ok(EntitySnapshot {
            id: self.id,
            name: attributes.name,
            position: attributes.position,
            stats: attributes.stats,
            dead: attributes.dead,
            inventory: self.inventory(),
            statuses,
            immunity,
        })
    }
}

impl StatusTarget for Entity {
    fn entity_id(&self) -> EntityId {
        self.id
    }

    fn is_dead(&self) -> bool {
        Entity::is_dead(self)
    }
}
