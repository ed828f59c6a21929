//! Temporary per-status immunity windows.
//!
//! Expiry is lazy: an entry whose timestamp is at or before `now` answers
//! exactly like a missing entry, so nothing ever has to sweep the table for
//! correctness. [`ImmunityTracker::purge_expired`] exists only to bound
//! memory.

use std::collections::HashMap;

use affliction_rules::StatusId;
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Expiry timestamps keyed by status.
///
/// # Example
///
/// ```
/// use affliction_core::immunity::ImmunityTracker;
/// use affliction_core::time::Timestamp;
/// use affliction_rules::StatusId;
///
/// let mut immunity = ImmunityTracker::new();
/// immunity.grant(StatusId::POISON, Timestamp::from_secs(10));
///
/// assert!(immunity.is_immune(StatusId::POISON, Timestamp::from_secs(9)));
/// assert!(!immunity.is_immune(StatusId::POISON, Timestamp::from_secs(10)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmunityTracker {
    expiries: HashMap<StatusId, Timestamp>,
}

impl ImmunityTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            expiries: HashMap::new(),
        }
    }

    /// Returns `true` iff an expiry for `id` is strictly after `now`.
    #[must_use]
    pub fn is_immune(&self, id: StatusId, now: Timestamp) -> bool {
        self.active_until(id, now).is_some()
    }

    /// Returns the expiry for `id` if the immunity is still in force at `now`.
    #[must_use]
    pub fn active_until(&self, id: StatusId, now: Timestamp) -> Option<Timestamp> {
        self.expiries
            .get(&id)
            .copied()
            .filter(|&until| until > now)
    }

    /// Installs or extends immunity to `id` until `until`.
    ///
    /// A later `until` always wins; an earlier one never shortens an existing
    /// window. Returns the effective expiry.
    pub fn grant(&mut self, id: StatusId, until: Timestamp) -> Timestamp {
        let expiry = self.expiries.entry(id).or_insert(until);
        if until > *expiry {
            *expiry = until;
        }
        *expiry
    }

    /// Drops any record for `id`, returning `true` if one existed.
    pub fn revoke(&mut self, id: StatusId) -> bool {
        self.expiries.remove(&id).is_some()
    }

    /// Removes records that no longer block anything at `now`.
    ///
    /// Returns how many were removed.
    pub fn purge_expired(&mut self, now: Timestamp) -> usize {
        let before = self.expiries.len();
        self.expiries.retain(|_, until| *until > now);
        before - self.expiries.len()
    }

    /// Number of stored records, including lapsed ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    /// Returns `true` if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }
}
