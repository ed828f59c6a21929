//! Status identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque key naming a kind of status condition.
///
/// Identifiers are plain integers so the surrounding system can map them
/// directly from whatever numbering the game server uses. A handful of
/// well-known identifiers are provided as associated constants.
///
/// # Example
///
/// ```
/// use affliction_rules::StatusId;
///
/// assert_eq!(StatusId::POISON.as_u16(), 1);
/// assert_eq!(StatusId::new(1), StatusId::POISON);
/// assert_eq!(StatusId::HASTE.to_string(), "haste");
/// assert_eq!(StatusId::new(900).to_string(), "status#900");
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusId(u16);

impl StatusId {
    /// Damage over time.
    pub const POISON: Self = Self(1);
    /// Cannot cast skills.
    pub const SILENCE: Self = Self(2);
    /// Increased attack and movement speed.
    pub const HASTE: Self = Self(3);
    /// Brings a dead entity back. The only status a dead target accepts by default.
    pub const REVIVE: Self = Self(4);

    /// Creates an identifier from its raw value.
    #[must_use]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the well-known name of this identifier, if it has one.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            1 => Some("poison"),
            2 => Some("silence"),
            3 => Some("haste"),
            4 => Some("revive"),
            _ => None,
        }
    }
}

impl fmt::Debug for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "StatusId({}:{name})", self.0),
            None => write!(f, "StatusId({})", self.0),
        }
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "status#{}", self.0),
        }
    }
}

impl From<u16> for StatusId {
    fn from(raw: u16) -> Self {
        Self::new(raw)
    }
}

impl From<StatusId> for u16 {
    fn from(id: StatusId) -> Self {
        id.0
    }
}
