//! Test helper functions for setting up rules, engines and entities.

use std::sync::Arc;
use std::time::Duration;

use affliction_rules::{RuleGraph, StatusFlags, StatusId};

use crate::effect::StatusEffect;
use crate::engine::StatusEngine;
use crate::entity::{Entity, EntityId, Stats};
use crate::time::Timestamp;

/// Installs a test-writer tracing subscriber once per process.
///
/// Safe to call from every test; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// The standard rule graph behind an `Arc`.
pub fn standard_rules() -> Arc<RuleGraph> {
    Arc::new(RuleGraph::standard())
}

/// Silence and Haste block each other; both refreshable.
pub fn mutually_blocking_rules() -> Arc<RuleGraph> {
    let graph = RuleGraph::builder()
        .status(StatusId::SILENCE, StatusFlags::REFRESHABLE, 1)
        .status(StatusId::HASTE, StatusFlags::REFRESHABLE, 1)
        .blocks(StatusId::SILENCE, StatusId::HASTE)
        .blocks(StatusId::HASTE, StatusId::SILENCE)
        .build()
        .unwrap();
    Arc::new(graph)
}

/// Poison stacks up to `max_stacks`.
pub fn stacking_poison_rules(max_stacks: u32) -> Arc<RuleGraph> {
    let graph = RuleGraph::builder()
        .status(
            StatusId::POISON,
            StatusFlags::REFRESHABLE | StatusFlags::STACKABLE,
            max_stacks,
        )
        .build()
        .unwrap();
    Arc::new(graph)
}

/// A living entity with HP 80/100 and SP 10/10.
pub fn spawn_entity(id: u64, rules: Arc<RuleGraph>) -> Entity {
    Entity::new(EntityId::new(id), format!("entity-{id}"), Stats::new(80, 100, 10, 10), rules)
}

/// An engine for entity 1.
pub fn engine(rules: Arc<RuleGraph>) -> StatusEngine {
    StatusEngine::new(EntityId::new(1), rules)
}

/// A candidate shaped by the rule graph.
pub fn candidate(rules: &RuleGraph, id: StatusId, secs: u64) -> StatusEffect {
    StatusEffect::from_rules(rules, id, Duration::from_secs(secs))
}

/// Shorthand for a timestamp in whole seconds.
pub fn at(secs: u64) -> Timestamp {
    Timestamp::from_secs(secs)
}
