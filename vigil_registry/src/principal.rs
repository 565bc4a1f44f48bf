//! Principal records.

use serde::{Deserialize, Serialize};

use vigil_core::error::{RegistryError, Result};
use vigil_core::{names, Rank, Restriction};

/// The persisted record of a named actor.
///
/// A principal is never hard-deleted: demotion back to mortal erases the
/// volatile fields and renames the persisted record out of the live
/// namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Lower-case unique name.
    pub name: String,

    pub rank: Rank,

    /// Optional finer-grained level within the rank.
    #[serde(default)]
    pub level: Option<u16>,

    /// Domain affiliation, if any.
    #[serde(default)]
    pub domain: Option<String>,

    #[serde(default)]
    pub restrictions: Restriction,

    /// Back-reference to this principal's mentor. Mutually exclusive with
    /// having students.
    #[serde(default)]
    pub mentor: Option<String>,

    /// Back-references to this principal's students.
    #[serde(default)]
    pub students: Vec<String>,
}

impl Principal {
    /// Create a minimal mortal record.
    pub fn new(name: &str) -> Result<Principal> {
        if !names::valid_principal_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()).into());
        }
        Ok(Principal {
            name: name.to_string(),
            rank: Rank::Mortal,
            level: None,
            domain: None,
            restrictions: Restriction::empty(),
            mentor: None,
            students: Vec::new(),
        })
    }

    pub fn is_student(&self) -> bool {
        self.mentor.is_some()
    }

    pub fn is_mentor(&self) -> bool {
        !self.students.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_principal_is_mortal() {
        let p = Principal::new("alice").unwrap();
        assert_eq!(p.rank, Rank::Mortal);
        assert!(p.domain.is_none());
        assert!(!p.is_student() && !p.is_mentor());
    }

    #[test]
    fn test_name_validation() {
        assert!(Principal::new("Alice").is_err());
        assert!(Principal::new("").is_err());
        assert!(Principal::new("bob2").is_ok());
    }

    #[test]
    fn test_serde_defaults() {
        // Old records without the newer fields still load.
        let p: Principal =
            serde_json::from_str(r#"{"name": "alice", "rank": "normal"}"#).unwrap();
        assert_eq!(p.rank, Rank::Normal);
        assert!(p.students.is_empty());
        assert!(p.restrictions.is_empty());
    }
}
