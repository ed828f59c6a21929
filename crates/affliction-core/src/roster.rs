//! The set of live entities.
//!
//! A [`Roster`] owns every [`Entity`] keyed by [`EntityId`] and shares a
//! single [`RuleGraph`] between their status engines. It also runs the two
//! periodic sweeps that no single engine runs on its own:
//!
//! - [`Roster::sweep_expired`]: removes effects whose duration has passed
//! - [`Roster::validate_all`]: the defensive consistency check
//!
//! Both sweeps touch each entity's own locks only, so they run across
//! entities in parallel with `rayon`. Results are reported in id order.
//!
//! # Determinism
//!
//! Entities live in a `BTreeMap` and ids are assigned monotonically, so
//! iteration order is the spawn order and is stable across runs.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use affliction_core::entity::Stats;
//! use affliction_core::roster::Roster;
//! use affliction_core::time::Timestamp;
//! use affliction_rules::{RuleGraph, StatusId};
//!
//! let mut roster = Roster::new(Arc::new(RuleGraph::standard()));
//! let poring = roster.spawn("Poring", Stats::new(50, 50, 0, 0));
//!
//! roster
//!     .get(poring)
//!     .unwrap()
//!     .statuses()
//!     .apply(StatusId::POISON, true, Duration::from_secs(3), Timestamp::ZERO)
//!     .unwrap();
//!
//! let swept = roster.sweep_expired(Timestamp::from_secs(3));
//! assert_eq!(swept[&poring], vec![StatusId::POISON]);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use affliction_rules::{RuleGraph, StatusId};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::entity::{Entity, EntityId, Stats};
use crate::error::EntityError;
use crate::time::Timestamp;

/// All entities, in id order.
#[derive(Debug)]
pub struct Roster {
    /// Monotonically increasing entity ID counter.
    next_id: u64,
    entities: BTreeMap<EntityId, Entity>,
    rules: Arc<RuleGraph>,
}

impl Roster {
    /// Creates an empty roster whose entities share `rules`.
    #[must_use]
    pub fn new(rules: Arc<RuleGraph>) -> Self {
        Self {
            next_id: 0,
            entities: BTreeMap::new(),
            rules,
        }
    }

    /// The rule graph every entity in this roster uses.
    #[must_use]
    pub fn rules(&self) -> &Arc<RuleGraph> {
        &self.rules
    }

    /// Creates a living entity and returns its id.
    pub fn spawn(&mut self, name: impl Into<String>, stats: Stats) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;

        let entity = Entity::new(id, name, stats, Arc::clone(&self.rules));
        self.entities.insert(id, entity);
        id
    }

    /// Adds an entity built elsewhere (for example from a snapshot).
    ///
    /// Returns the entity previously stored under the same id, if any. The id
    /// counter moves past the inserted id so later spawns never collide.
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        let id = entity.id();
        self.next_id = self.next_id.max(id.as_u64().saturating_add(1));
        self.entities.insert(id, entity)
    }

    /// Removes an entity, dropping its status engine with it.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Looks up an entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the roster has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.values()
    }

    /// Removes expired effects and lapsed immunities on every entity.
    ///
    /// Entities with nothing expired are left out of the result. An entity
    /// whose status lock is poisoned is logged and skipped.
    pub fn sweep_expired(&self, now: Timestamp) -> BTreeMap<EntityId, Vec<StatusId>> {
        let swept: BTreeMap<EntityId, Vec<StatusId>> = self
            .entities
            .par_iter()
            .filter_map(|(&id, entity)| match entity.statuses().sweep_expired(now) {
                Ok(expired) if expired.is_empty() => None,
                Ok(expired) => Some((id, expired)),
                Err(error) => {
                    warn!(entity = %id, %error, "expiry sweep skipped entity");
                    None
                }
            })
            .collect();

        if !swept.is_empty() {
            info!(%now, entities = swept.len(), "expiry sweep removed statuses");
        }
        swept
    }

    /// Runs [`Entity::validate`] on every entity and returns the failures in
    /// id order.
    pub fn validate_all(&self) -> Vec<(EntityId, EntityError)> {
        let mut failures: Vec<(EntityId, EntityError)> = self
            .entities
            .par_iter()
            .filter_map(|(&id, entity)| entity.validate().err().map(|error| (id, error)))
            .collect();
        failures.sort_by_key(|(id, _)| *id);

        for (id, error) in &failures {
            warn!(entity = %id, %error, "entity failed consistency check");
        }
        failures
    }
}
