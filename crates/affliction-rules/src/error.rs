//! Errors raised while building a rule graph.

use crate::id::StatusId;

/// A rule table that cannot be turned into a [`RuleGraph`](crate::RuleGraph).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// A status lists itself as a blocker or as overridden.
    #[error("{id} cannot {relation} itself")]
    SelfReference {
        /// The offending status.
        id: StatusId,
        /// `"block"` or `"override"`.
        relation: &'static str,
    },

    /// A status declares a stack cap of zero.
    #[error("{id} declares max_stacks = 0; the cap must be at least 1")]
    ZeroMaxStacks {
        /// The offending status.
        id: StatusId,
    },

    /// The same status appears twice in a rule table.
    #[error("{id} is defined more than once")]
    DuplicateRule {
        /// The duplicated status.
        id: StatusId,
    },
}
