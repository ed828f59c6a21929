//! End-to-end status lifecycles on a single entity.

use std::time::Duration;

use affliction_rules::{RuleTable, StatusId};

use crate::effect::ApplyOutcome;
use crate::engine::Admission;
use crate::entity::{Entity, EntityId, EntitySnapshot, Stats};
use crate::error::{ConflictReason, ErrorKind, StatusError};

use super::helpers::{at, candidate, init_tracing, spawn_entity, stacking_poison_rules, standard_rules};

#[test]
fn poison_insert_refresh_remove() {
    init_tracing();
    let entity = spawn_entity(1, standard_rules());
    assert_eq!(entity.stats(), Stats::new(80, 100, 10, 10));
    let engine = entity.statuses();

    assert_eq!(
        engine.apply(StatusId::POISON, true, Duration::from_secs(10), at(0)),
        Ok(ApplyOutcome::Inserted)
    );
    assert_eq!(engine.active_ids().unwrap(), vec![StatusId::POISON]);

    assert_eq!(
        engine.apply(StatusId::POISON, true, Duration::from_secs(5), at(1)),
        Ok(ApplyOutcome::Refreshed {
            duration: Duration::from_secs(10),
            stacks: 1
        })
    );
    let poison = engine.effect(StatusId::POISON).unwrap().unwrap();
    assert_eq!(poison.duration(), Duration::from_secs(10));
    assert_eq!(poison.started_at(), at(0));

    assert_eq!(
        engine.apply(StatusId::POISON, false, Duration::ZERO, at(2)),
        Ok(ApplyOutcome::Removed)
    );
    assert!(engine.is_empty().unwrap());
    assert!(entity.validate().is_ok());
}

#[test]
fn silence_blocks_haste() {
    init_tracing();
    let entity = spawn_entity(1, standard_rules());
    let rules = entity.statuses().rules().clone();

    entity
        .apply_status(candidate(&rules, StatusId::SILENCE, 30), at(0))
        .unwrap();

    let haste = candidate(&rules, StatusId::HASTE, 30);
    let err = entity.statuses().validate(&entity, &haste, at(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StatusConflict);
    assert_eq!(
        err,
        StatusError::Conflict {
            candidate: StatusId::HASTE,
            conflicting: StatusId::SILENCE,
            reason: ConflictReason::BlockedBy
        }
    );

    // Once Silence wears off, Haste is admitted.
    entity.statuses().sweep_expired(at(30)).unwrap();
    assert_eq!(
        entity.statuses().validate(&entity, &haste, at(30)),
        Ok(Admission::Insert)
    );
}

#[test]
fn death_and_revive() {
    init_tracing();
    let entity = spawn_entity(1, standard_rules());
    let rules = entity.statuses().rules().clone();
    entity.set_dead(true);

    let poison = candidate(&rules, StatusId::POISON, 10);
    assert_eq!(
        entity.apply_status(poison.clone(), at(0)).map_err(|e| e.kind()),
        Err(ErrorKind::TargetStateInvalid)
    );

    entity
        .apply_status(candidate(&rules, StatusId::REVIVE, 1), at(0))
        .unwrap();
    entity.set_dead(false);
    assert_eq!(entity.apply_status(poison, at(1)), Ok(ApplyOutcome::Inserted));
}

#[test]
fn immunity_granted_on_wear_off() {
    init_tracing();
    let entity = spawn_entity(1, standard_rules());
    let rules = entity.statuses().rules().clone();
    let engine = entity.statuses();

    entity
        .apply_status(candidate(&rules, StatusId::POISON, 5), at(0))
        .unwrap();
    let expired = engine.sweep_expired(at(5)).unwrap();
    assert_eq!(expired, vec![StatusId::POISON]);

    // A collaborator grants a short immunity when Poison wears off.
    engine.grant_immunity(StatusId::POISON, at(8)).unwrap();

    let err = entity
        .apply_status(candidate(&rules, StatusId::POISON, 5), at(6))
        .unwrap_err();
    assert_eq!(err.to_string(), "immune to poison until t=8000ms");
    assert_eq!(
        entity.apply_status(candidate(&rules, StatusId::POISON, 5), at(8)),
        Ok(ApplyOutcome::Inserted)
    );
}

#[test]
fn stacking_from_several_sources() {
    init_tracing();
    let rules = stacking_poison_rules(3);
    let entity = spawn_entity(1, rules.clone());

    for (tick, source) in [(0, 7), (1, 8), (2, 9), (3, 10)] {
        let poison = candidate(&rules, StatusId::POISON, 10).with_source(EntityId::new(source));
        entity.apply_status(poison, at(tick)).unwrap();
    }

    let poison = entity.statuses().effect(StatusId::POISON).unwrap().unwrap();
    assert_eq!(poison.stacks(), 3);
    assert_eq!(poison.source(), Some(EntityId::new(7)));
}

#[test]
fn configured_rules_drive_the_engine() {
    init_tracing();
    let json = r#"{
        "statuses": [
            { "id": 2, "flags": "REFRESHABLE" },
            { "id": 3, "flags": "REFRESHABLE", "blocked_by": [2] },
            { "id": 4 }
        ]
    }"#;
    let table: RuleTable = serde_json::from_str(json).unwrap();
    let rules = std::sync::Arc::new(affliction_rules::RuleGraph::from_table(&table).unwrap());
    let entity = spawn_entity(1, rules.clone());

    entity
        .apply_status(candidate(&rules, StatusId::SILENCE, 10), at(0))
        .unwrap();
    assert!(entity
        .apply_status(candidate(&rules, StatusId::HASTE, 10), at(1))
        .is_err());
}

#[test]
fn snapshot_restores_engine_state() {
    init_tracing();
    let rules = standard_rules();
    let entity = spawn_entity(4, rules.clone());
    entity
        .apply_status(candidate(&rules, StatusId::SILENCE, 20), at(0))
        .unwrap();
    entity.statuses().grant_immunity(StatusId::POISON, at(15)).unwrap();

    let json = serde_json::to_string(&entity.snapshot().unwrap()).unwrap();
    let snapshot: EntitySnapshot = serde_json::from_str(&json).unwrap();
    let restored = Entity::from_snapshot(snapshot, rules.clone()).unwrap();

    assert_eq!(restored.id(), entity.id());
    assert!(restored
        .apply_status(candidate(&rules, StatusId::HASTE, 5), at(1))
        .is_err());
    assert!(restored
        .apply_status(candidate(&rules, StatusId::POISON, 5), at(1))
        .is_err());
    assert_eq!(
        restored.statuses().effects().unwrap(),
        entity.statuses().effects().unwrap()
    );
}
