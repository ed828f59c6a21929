//! Application flags carried by each status.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// How a status behaves when it is applied again while already active.
    ///
    /// With neither flag set, a second application of an active status is
    /// rejected outright.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct StatusFlags: u8 {
        /// Reapplication extends the duration instead of failing.
        const REFRESHABLE = 0b0000_0001;
        /// Reapplication from any source adds a stack, up to the status' cap.
        const STACKABLE   = 0b0000_0010;
    }
}

impl StatusFlags {
    /// Returns `true` if reapplication may refresh the active instance.
    #[must_use]
    pub const fn is_refreshable(self) -> bool {
        self.contains(Self::REFRESHABLE)
    }

    /// Returns `true` if reapplication adds stacks.
    #[must_use]
    pub const fn is_stackable(self) -> bool {
        self.contains(Self::STACKABLE)
    }
}
