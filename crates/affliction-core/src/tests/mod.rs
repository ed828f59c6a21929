//! Scenario, concurrency and property tests for the status engine.
//!
//! # Test Structure
//!
//! - `scenarios.rs`: End-to-end status lifecycles on a single entity
//! - `concurrency.rs`: Racing callers on one shared engine
//! - `properties.rs`: `proptest` invariants over random operation sequences
//! - `helpers.rs`: Test setup utilities and factory functions

mod helpers;
mod scenarios;

// Re-export for convenience
pub use helpers::*;
