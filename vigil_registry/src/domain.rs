//! Domain records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use vigil_core::error::{RegistryError, Result};
use vigil_core::names;

/// Default member cap for a newly created domain.
pub const DEFAULT_MAX_MEMBERS: usize = 12;

/// The persisted record of an organizational unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Capitalized unique name.
    pub name: String,

    /// Immutable three-letter short code.
    pub code: String,

    /// Ordinal assigned at creation; never reused.
    pub number: u32,

    /// Officer slots. Officers are always members.
    #[serde(default)]
    pub lord: Option<String>,
    #[serde(default)]
    pub steward: Option<String>,

    /// Member names, officers included.
    #[serde(default)]
    pub members: BTreeSet<String>,

    /// Soft cap, enforced at join time only.
    pub max_members: usize,

    /// Accumulated experience and command counters.
    #[serde(default)]
    pub experience: i64,
    #[serde(default)]
    pub commands: u64,

    /// Pending membership applications.
    #[serde(default)]
    pub applications: BTreeSet<String>,
}

impl Domain {
    pub fn new(name: &str, code: &str, number: u32) -> Result<Domain> {
        if !names::valid_domain_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()).into());
        }
        if !names::valid_domain_code(code) {
            return Err(RegistryError::InvalidName(code.to_string()).into());
        }
        Ok(Domain {
            name: name.to_string(),
            code: code.to_string(),
            number,
            lord: None,
            steward: None,
            members: BTreeSet::new(),
            max_members: DEFAULT_MAX_MEMBERS,
            experience: 0,
            commands: 0,
            applications: BTreeSet::new(),
        })
    }

    pub fn is_officer(&self, name: &str) -> bool {
        self.lord.as_deref() == Some(name) || self.steward.as_deref() == Some(name)
    }

    pub fn is_member(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.max_members
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_domain() {
        let d = Domain::new("Acme", "acm", 3).unwrap();
        assert_eq!(d.number, 3);
        assert!(d.members.is_empty());
        assert!(!d.is_full());
    }

    #[test]
    fn test_name_and_code_validation() {
        assert!(Domain::new("acme", "acm", 1).is_err());
        assert!(Domain::new("Acme", "acme", 1).is_err());
        assert!(Domain::new("Acme", "AC1", 1).is_err());
    }

    #[test]
    fn test_officers() {
        let mut d = Domain::new("Acme", "acm", 1).unwrap();
        d.members.insert("alice".to_string());
        d.lord = Some("alice".to_string());
        assert!(d.is_officer("alice"));
        assert!(!d.is_officer("bob"));
    }
}
