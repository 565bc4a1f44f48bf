//! Restriction flags on a principal.
//!
//! A restriction bitset rides on the principal record and is consulted by
//! the decision engine. Only the snoop-related flags influence permission
//! decisions; the rest are carried for the world layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bitset of restrictions applied to a principal.
///
/// Serialized as the raw integer so the persisted record stays compact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Hash,
)]
#[serde(transparent)]
pub struct Restriction(u32);

impl Restriction {
    /// May never snoop anyone.
    pub const NO_SNOOP: Restriction = Restriction(1 << 0);
    /// May only snoop members of their own domain.
    pub const SNOOP_DOMAIN_ONLY: Restriction = Restriction(1 << 1);
    /// Actions are mirrored to the principal's restriction log.
    pub const LOGGED: Restriction = Restriction(1 << 2);
    /// May not teleport.
    pub const NO_TELEPORT: Restriction = Restriction(1 << 3);
    /// May not shout.
    pub const NO_SHOUT: Restriction = Restriction(1 << 4);

    pub const fn empty() -> Restriction {
        Restriction(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Restriction) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn with(self, other: Restriction) -> Restriction {
        Restriction(self.0 | other.0)
    }

    #[must_use]
    pub const fn without(self, other: Restriction) -> Restriction {
        Restriction(self.0 & !other.0)
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Restriction::NO_SNOOP) {
            names.push("no-snoop");
        }
        if self.contains(Restriction::SNOOP_DOMAIN_ONLY) {
            names.push("snoop-domain-only");
        }
        if self.contains(Restriction::LOGGED) {
            names.push("logged");
        }
        if self.contains(Restriction::NO_TELEPORT) {
            names.push("no-teleport");
        }
        if self.contains(Restriction::NO_SHOUT) {
            names.push("no-shout");
        }
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(","))
        }
    }
}
