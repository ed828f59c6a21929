//! Serializable rule table loaded at startup.
//!
//! The table is the configuration form of a [`RuleGraph`](crate::RuleGraph):
//! one entry per status, with relationships written from the point of view
//! of that status. The surrounding system picks the file format; anything
//! serde can read works.
//!
//! ```
//! use affliction_rules::{RuleGraph, RuleTable, StatusId};
//!
//! let json = r#"{
//!     "revive": 4,
//!     "statuses": [
//!         { "id": 3, "flags": "REFRESHABLE", "blocked_by": [2] },
//!         { "id": 2, "flags": "REFRESHABLE" }
//!     ]
//! }"#;
//! let table: RuleTable = serde_json::from_str(json).unwrap();
//! let graph = RuleGraph::from_table(&table).unwrap();
//! assert!(graph.blocked_by(StatusId::HASTE).contains(StatusId::SILENCE));
//! ```

use serde::{Deserialize, Serialize};

use crate::flags::StatusFlags;
use crate::id::StatusId;

/// Rules for one status as they appear in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    /// The status these rules describe.
    pub id: StatusId,
    /// Application flags.
    #[serde(default)]
    pub flags: StatusFlags,
    /// Stack cap.
    #[serde(default = "default_max_stacks")]
    pub max_stacks: u32,
    /// Statuses that block this one while active.
    #[serde(default)]
    pub blocked_by: Vec<StatusId>,
    /// Statuses this one overrides.
    #[serde(default)]
    pub overrides: Vec<StatusId>,
}

impl RuleEntry {
    /// An entry with no flags, a stack cap of 1 and no relationships.
    #[must_use]
    pub fn new(id: StatusId) -> Self {
        Self {
            id,
            flags: StatusFlags::empty(),
            max_stacks: default_max_stacks(),
            blocked_by: Vec::new(),
            overrides: Vec::new(),
        }
    }
}

fn default_max_stacks() -> u32 {
    1
}

fn default_revive() -> StatusId {
    StatusId::REVIVE
}

/// A full rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    /// The status a dead target may still receive.
    #[serde(default = "default_revive")]
    pub revive: StatusId,
    /// Per-status rules.
    #[serde(default)]
    pub statuses: Vec<RuleEntry>,
}

impl Default for RuleTable {
    /// Poison, Silence and Haste are refreshable single-stack statuses;
    /// Silence blocks Haste; Revive has no flags.
    fn default() -> Self {
        Self {
            revive: StatusId::REVIVE,
            statuses: vec![
                RuleEntry {
                    flags: StatusFlags::REFRESHABLE,
                    ..RuleEntry::new(StatusId::POISON)
                },
                RuleEntry {
                    flags: StatusFlags::REFRESHABLE,
                    ..RuleEntry::new(StatusId::SILENCE)
                },
                RuleEntry {
                    flags: StatusFlags::REFRESHABLE,
                    blocked_by: vec![StatusId::SILENCE],
                    ..RuleEntry::new(StatusId::HASTE)
                },
                RuleEntry::new(StatusId::REVIVE),
            ],
        }
    }
}
