//! The world probe.
//!
//! The decision engine needs two facts only the running world knows:
//! whether a principal currently stands in a protected location
//! (a sanctuary, where mortals cannot be snooped by ordinary wizards) and
//! who, if anyone, is already snooping a principal. Both are volatile
//! simulation state, so they arrive through this trait instead of a
//! store.

/// Live world state consulted during snoop decisions.
pub trait WorldProbe: Send + Sync {
    /// Whether `name` currently stands in a protected location.
    fn in_protected_location(&self, name: &str) -> bool;

    /// The principal currently snooping `name`, if any.
    fn snooper_of(&self, name: &str) -> Option<String>;
}

/// A probe for a world with no protected locations and no active snoops.
/// The default for tests and for hosts that do not track either.
#[derive(Debug, Default)]
pub struct NullProbe;

impl WorldProbe for NullProbe {
    fn in_protected_location(&self, _name: &str) -> bool {
        false
    }

    fn snooper_of(&self, _name: &str) -> Option<String> {
        None
    }
}
