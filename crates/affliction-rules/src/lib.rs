//! # Affliction Rules
//!
//! Static rule graph for status effects.
//!
//! This crate answers two questions for any status identifier:
//!
//! - **Blocked by**: which active statuses prevent it from being applied
//! - **Overrides**: which statuses it declares itself superior to
//!
//! It also carries the per-status application flags (refreshable, stackable)
//! and stack caps. The graph is built once, usually from a [`RuleTable`]
//! loaded at startup, and is immutable afterwards so it can be shared
//! between every entity without locking.
//!
//! ## Quick Start
//!
//! ```
//! use affliction_rules::{RuleGraph, StatusFlags, StatusId};
//!
//! let graph = RuleGraph::builder()
//!     .status(StatusId::HASTE, StatusFlags::REFRESHABLE, 1)
//!     .status(StatusId::SILENCE, StatusFlags::REFRESHABLE, 1)
//!     .blocks(StatusId::SILENCE, StatusId::HASTE)
//!     .build()
//!     .unwrap();
//!
//! assert!(graph.blocked_by(StatusId::HASTE).contains(StatusId::SILENCE));
//! assert!(graph.blocked_by(StatusId::POISON).is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod flags;
pub mod graph;
pub mod id;
pub mod table;

// Re-exports for convenience
pub use error::RuleError;
pub use flags::StatusFlags;
pub use graph::{RuleGraph, RuleGraphBuilder, StatusRule, StatusSet};
pub use id::StatusId;
pub use table::{RuleEntry, RuleTable};
