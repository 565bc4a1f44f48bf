//! The rank hierarchy.
//!
//! Ranks form a total order of privilege from `Mortal` up to `Keeper`.
//! Rank *changes* are constrained separately by a transition graph: a
//! mutator may only move a principal along a single declared edge, so a
//! mortal can never jump straight to lord.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Privilege level of a principal, lowest first.
///
/// The derived `Ord` is the privilege order used by the decision engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    #[default]
    Mortal,
    Apprentice,
    Pilgrim,
    Retired,
    Normal,
    Mage,
    Steward,
    Lord,
    Arch,
    Keeper,
}

impl Rank {
    /// All ranks, lowest first.
    pub const ALL: [Rank; 10] = [
        Rank::Mortal,
        Rank::Apprentice,
        Rank::Pilgrim,
        Rank::Retired,
        Rank::Normal,
        Rank::Mage,
        Rank::Steward,
        Rank::Lord,
        Rank::Arch,
        Rank::Keeper,
    ];

    /// Check whether a single declared transition edge exists from `self`
    /// to `to`.
    ///
    /// Demotion to `Mortal` is reachable from every wizard rank (it purges
    /// the identity record). Everything else follows the promotion ladder
    /// plus the lateral retire/pilgrim moves.
    pub fn can_transition(self, to: Rank) -> bool {
        use Rank::*;
        if self == to {
            return false;
        }
        // Any wizard rank can be demoted back to mortal.
        if to == Mortal {
            return self != Mortal;
        }
        match self {
            Mortal => matches!(to, Apprentice),
            Apprentice => matches!(to, Normal | Pilgrim | Retired),
            Pilgrim => matches!(to, Normal | Retired | Apprentice),
            Retired => matches!(to, Normal | Pilgrim | Apprentice),
            Normal => matches!(to, Mage | Steward | Pilgrim | Retired | Apprentice),
            Mage => matches!(to, Steward | Lord | Normal | Apprentice),
            Steward => matches!(to, Lord | Mage | Normal | Apprentice),
            Lord => matches!(to, Arch | Steward | Mage | Normal | Apprentice),
            Arch => matches!(to, Keeper | Lord),
            Keeper => matches!(to, Arch),
        }
    }

    /// Whether this rank counts as staff (anything above mortal).
    pub fn is_wizard(self) -> bool {
        self > Rank::Mortal
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Mortal => "mortal",
            Rank::Apprentice => "apprentice",
            Rank::Pilgrim => "pilgrim",
            Rank::Retired => "retired",
            Rank::Normal => "normal",
            Rank::Mage => "mage",
            Rank::Steward => "steward",
            Rank::Lord => "lord",
            Rank::Arch => "arch",
            Rank::Keeper => "keeper",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rank::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown rank: {}", s))
    }
}
