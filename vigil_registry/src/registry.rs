//! The identity and rank store.
//!
//! A single injected store object owning every principal and domain
//! record plus the small shared tables (global-read list, team rosters,
//! the domain ordinal counter). Loaded once at start; every mutator
//! persists the touched records before updating the in-memory caches, so
//! a storage failure aborts the operation without divergence.
//!
//! Accessors never fail: unknown names yield neutral defaults (mortal
//! rank, no affiliation, empty sets).

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use vigil_core::error::{RegistryError, Result, StorageError};
use vigil_core::storage::Storage;
use vigil_core::{names, Rank, Restriction};

use crate::domain::Domain;
use crate::principal::Principal;

/// Storage key of the shared tables.
const META_KEY: &str = "meta";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Meta {
    next_domain_number: u32,
    #[serde(default)]
    global_read: BTreeSet<String>,
    #[serde(default)]
    teams: BTreeMap<String, BTreeSet<String>>,
}

pub struct Registry {
    storage: Arc<dyn Storage>,
    principals: RwLock<HashMap<String, Principal>>,
    domains: RwLock<HashMap<String, Domain>>,
    meta: RwLock<Meta>,
}

impl Registry {
    /// Open the registry, loading every persisted record and seeding the
    /// reserved base and wizard holding domains on first start.
    pub fn open(storage: Arc<dyn Storage>) -> Result<Self> {
        let mut principals = HashMap::new();
        for key in storage.list("principal")? {
            let Some(value) = storage.load(&key)? else {
                continue;
            };
            // Retired records stay on disk but out of the live map.
            if key.ends_with(".removed") {
                continue;
            }
            let principal: Principal =
                serde_json::from_value(value).map_err(StorageError::Serde)?;
            principals.insert(principal.name.clone(), principal);
        }

        let mut domains = HashMap::new();
        for key in storage.list("domain")? {
            let Some(value) = storage.load(&key)? else {
                continue;
            };
            if key.ends_with(".removed") {
                continue;
            }
            let domain: Domain = serde_json::from_value(value).map_err(StorageError::Serde)?;
            domains.insert(domain.name.clone(), domain);
        }

        let meta: Meta = match storage.load(META_KEY)? {
            Some(value) => serde_json::from_value(value).map_err(StorageError::Serde)?,
            None => Meta {
                next_domain_number: 1,
                ..Meta::default()
            },
        };

        let registry = Self {
            storage,
            principals: RwLock::new(principals),
            domains: RwLock::new(domains),
            meta: RwLock::new(meta),
        };
        registry.seed_reserved_domains()?;
        Ok(registry)
    }

    fn seed_reserved_domains(&self) -> Result<()> {
        for (name, code) in [(names::BASE_DOMAIN, "bas"), (names::WIZARD_DOMAIN, "wiz")] {
            if self.domains.read().contains_key(name) {
                continue;
            }
            let number = self.next_domain_number()?;
            let mut domain = Domain::new(name, code, number)?;
            // The holding domain takes everyone who loses a domain.
            if name == names::WIZARD_DOMAIN {
                domain.max_members = usize::MAX;
            }
            info!(domain = name, number, "seeding reserved domain");
            self.save_domain(&domain)?;
        }
        Ok(())
    }

    // ---- persistence helpers (durable first, cache second) ----

    fn save_principal(&self, principal: &Principal) -> Result<()> {
        let key = format!("principal/{}", principal.name);
        let value = serde_json::to_value(principal).map_err(StorageError::Serde)?;
        self.storage.save(&key, &value)?;
        self.principals
            .write()
            .insert(principal.name.clone(), principal.clone());
        Ok(())
    }

    fn save_domain(&self, domain: &Domain) -> Result<()> {
        let key = format!("domain/{}", domain.name);
        let value = serde_json::to_value(domain).map_err(StorageError::Serde)?;
        self.storage.save(&key, &value)?;
        self.domains
            .write()
            .insert(domain.name.clone(), domain.clone());
        Ok(())
    }

    fn save_meta(&self, meta: &Meta) -> Result<()> {
        let value = serde_json::to_value(meta).map_err(StorageError::Serde)?;
        self.storage.save(META_KEY, &value)?;
        *self.meta.write() = meta.clone();
        Ok(())
    }

    // ---- accessors ----

    /// Rank of a principal; mortal for unknown names.
    pub fn rank_of(&self, name: &str) -> Rank {
        self.principals
            .read()
            .get(name)
            .map(|p| p.rank)
            .unwrap_or_default()
    }

    pub fn level_of(&self, name: &str) -> Option<u16> {
        self.principals.read().get(name).and_then(|p| p.level)
    }

    /// Domain affiliation; `None` for unknown or unaffiliated names.
    pub fn domain_of(&self, name: &str) -> Option<String> {
        self.principals
            .read()
            .get(name)
            .and_then(|p| p.domain.clone())
    }

    pub fn restriction_of(&self, name: &str) -> Restriction {
        self.principals
            .read()
            .get(name)
            .map(|p| p.restrictions)
            .unwrap_or_default()
    }

    pub fn mentor_of(&self, name: &str) -> Option<String> {
        self.principals
            .read()
            .get(name)
            .and_then(|p| p.mentor.clone())
    }

    pub fn students_of(&self, name: &str) -> Vec<String> {
        self.principals
            .read()
            .get(name)
            .map(|p| p.students.clone())
            .unwrap_or_default()
    }

    pub fn lookup_principal(&self, name: &str) -> Option<Principal> {
        self.principals.read().get(name).cloned()
    }

    pub fn lookup_domain(&self, name: &str) -> Option<Domain> {
        self.domains.read().get(name).cloned()
    }

    pub fn members_of(&self, domain: &str) -> BTreeSet<String> {
        self.domains
            .read()
            .get(domain)
            .map(|d| d.members.clone())
            .unwrap_or_default()
    }

    /// The domain in which `name` holds an officer slot, if any.
    pub fn officer_of(&self, name: &str) -> Option<String> {
        self.domains
            .read()
            .values()
            .find(|d| d.is_officer(name))
            .map(|d| d.name.clone())
    }

    pub fn principals(&self) -> Vec<String> {
        let mut out: Vec<String> = self.principals.read().keys().cloned().collect();
        out.sort();
        out
    }

    pub fn domains(&self) -> Vec<String> {
        let mut out: Vec<String> = self.domains.read().keys().cloned().collect();
        out.sort();
        out
    }

    pub fn is_global_read(&self, name: &str) -> bool {
        self.meta.read().global_read.contains(name)
    }

    pub fn team_members(&self, team: &str) -> BTreeSet<String> {
        self.meta
            .read()
            .teams
            .get(team)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_team_member(&self, team: &str, name: &str) -> bool {
        self.meta
            .read()
            .teams
            .get(team)
            .map(|m| m.contains(name))
            .unwrap_or(false)
    }

    /// Whether `name` belongs to any team roster.
    pub fn in_any_team(&self, name: &str) -> bool {
        self.meta
            .read()
            .teams
            .values()
            .any(|members| members.contains(name))
    }

    // ---- principal mutators ----

    /// Create a minimal mortal record. First half of the two-step
    /// promotion sequence.
    pub fn create_principal(&self, name: &str) -> Result<()> {
        if self.principals.read().contains_key(name) {
            return Err(RegistryError::PrincipalExists(name.to_string()).into());
        }
        let principal = Principal::new(name)?;
        self.save_principal(&principal)?;
        debug!(name, "principal created");
        Ok(())
    }

    /// Drop a record that never became a wizard (promotion rollback).
    /// Unlike [`retire_principal`](Self::retire_principal) this removes
    /// the document outright.
    pub fn discard_principal(&self, name: &str) -> Result<()> {
        self.storage.remove(&format!("principal/{}", name))?;
        self.principals.write().remove(name);
        Ok(())
    }

    /// Move a demoted principal's record out of the live namespace. The
    /// document is renamed, not deleted.
    pub fn retire_principal(&self, name: &str) -> Result<()> {
        let from = format!("principal/{}", name);
        let to = format!("principal/{}.removed", name);
        self.storage.rename(&from, &to)?;
        self.principals.write().remove(name);
        info!(name, "principal retired");
        Ok(())
    }

    pub fn set_rank(&self, name: &str, to: Rank) -> Result<()> {
        let mut principal = self
            .lookup_principal(name)
            .ok_or_else(|| RegistryError::UnknownPrincipal(name.to_string()))?;
        if !principal.rank.can_transition(to) {
            return Err(RegistryError::InvalidTransition {
                from: principal.rank,
                to,
            }
            .into());
        }
        principal.rank = to;
        self.save_principal(&principal)
    }

    pub fn set_level(&self, name: &str, level: Option<u16>) -> Result<()> {
        let mut principal = self
            .lookup_principal(name)
            .ok_or_else(|| RegistryError::UnknownPrincipal(name.to_string()))?;
        principal.level = level;
        self.save_principal(&principal)
    }

    pub fn set_restriction(&self, name: &str, restrictions: Restriction) -> Result<()> {
        let mut principal = self
            .lookup_principal(name)
            .ok_or_else(|| RegistryError::UnknownPrincipal(name.to_string()))?;
        principal.restrictions = restrictions;
        self.save_principal(&principal)
    }

    pub fn clear_restriction(&self, name: &str) -> Result<()> {
        self.set_restriction(name, Restriction::empty())
    }

    pub fn join_domain(&self, name: &str, domain_name: &str) -> Result<()> {
        let mut principal = self
            .lookup_principal(name)
            .ok_or_else(|| RegistryError::UnknownPrincipal(name.to_string()))?;
        let mut domain = self
            .lookup_domain(domain_name)
            .ok_or_else(|| RegistryError::UnknownDomain(domain_name.to_string()))?;

        match &principal.domain {
            Some(current) if current == domain_name => return Ok(()),
            Some(current) => {
                return Err(RegistryError::AlreadyAffiliated {
                    name: name.to_string(),
                    domain: current.clone(),
                }
                .into())
            }
            None => {}
        }
        // Cap enforced at join time only.
        if domain.is_full() {
            return Err(RegistryError::DomainFull {
                domain: domain_name.to_string(),
                cap: domain.max_members,
            }
            .into());
        }

        domain.members.insert(name.to_string());
        principal.domain = Some(domain_name.to_string());
        self.save_domain(&domain)?;
        self.save_principal(&principal)?;
        debug!(name, domain = domain_name, "joined domain");
        Ok(())
    }

    /// Remove `name` from its domain, cascading out of any officer slot.
    /// A wizard above normal rank cannot leave the holding domain.
    pub fn leave_domain(&self, name: &str) -> Result<()> {
        let mut principal = self
            .lookup_principal(name)
            .ok_or_else(|| RegistryError::UnknownPrincipal(name.to_string()))?;
        let Some(domain_name) = principal.domain.clone() else {
            return Ok(());
        };
        if domain_name == names::WIZARD_DOMAIN && principal.rank > Rank::Normal {
            return Err(RegistryError::WizardDomainLocked(name.to_string()).into());
        }

        if let Some(mut domain) = self.lookup_domain(&domain_name) {
            domain.members.remove(name);
            if domain.lord.as_deref() == Some(name) {
                domain.lord = None;
            }
            if domain.steward.as_deref() == Some(name) {
                domain.steward = None;
            }
            self.save_domain(&domain)?;
        }
        principal.domain = None;
        self.save_principal(&principal)?;
        debug!(name, domain = %domain_name, "left domain");
        Ok(())
    }

    /// Register `mentor` as the mentor of `student`. A mentor cannot
    /// itself be a student and vice versa.
    pub fn set_mentor(&self, student: &str, mentor: &str) -> Result<()> {
        if student == mentor {
            return Err(RegistryError::MentorStudentConflict(student.to_string()).into());
        }
        let mut student_rec = self
            .lookup_principal(student)
            .ok_or_else(|| RegistryError::UnknownPrincipal(student.to_string()))?;
        let mut mentor_rec = self
            .lookup_principal(mentor)
            .ok_or_else(|| RegistryError::UnknownPrincipal(mentor.to_string()))?;

        if mentor_rec.is_student() {
            return Err(RegistryError::MentorStudentConflict(mentor.to_string()).into());
        }
        if student_rec.is_mentor() {
            return Err(RegistryError::MentorStudentConflict(student.to_string()).into());
        }

        // Re-mentoring moves the back-reference off the old mentor.
        if let Some(old) = student_rec.mentor.clone() {
            if old != mentor {
                if let Some(mut old_rec) = self.lookup_principal(&old) {
                    old_rec.students.retain(|s| s != student);
                    self.save_principal(&old_rec)?;
                }
            }
        }

        student_rec.mentor = Some(mentor.to_string());
        if !mentor_rec.students.iter().any(|s| s == student) {
            mentor_rec.students.push(student.to_string());
        }
        self.save_principal(&student_rec)?;
        self.save_principal(&mentor_rec)?;
        debug!(student, mentor, "mentor registered");
        Ok(())
    }

    /// Mentor-side spelling of [`set_mentor`](Self::set_mentor).
    pub fn add_student(&self, mentor: &str, student: &str) -> Result<()> {
        self.set_mentor(student, mentor)
    }

    /// Sever the link to one student; other students stay.
    pub fn remove_student(&self, mentor: &str, student: &str) -> Result<()> {
        if self.mentor_of(student).as_deref() != Some(mentor) {
            return Ok(());
        }
        self.clear_mentor(student)
    }

    pub fn clear_mentor(&self, student: &str) -> Result<()> {
        let mut student_rec = self
            .lookup_principal(student)
            .ok_or_else(|| RegistryError::UnknownPrincipal(student.to_string()))?;
        let Some(mentor) = student_rec.mentor.take() else {
            return Ok(());
        };
        if let Some(mut mentor_rec) = self.lookup_principal(&mentor) {
            mentor_rec.students.retain(|s| s != student);
            self.save_principal(&mentor_rec)?;
        }
        self.save_principal(&student_rec)
    }

    // ---- domain mutators ----

    /// Allocate the next domain ordinal, persisting the counter so a
    /// number is never reused even across restarts.
    pub fn next_domain_number(&self) -> Result<u32> {
        let mut meta = self.meta.read().clone();
        let number = meta.next_domain_number;
        meta.next_domain_number += 1;
        self.save_meta(&meta)?;
        Ok(number)
    }

    pub fn create_domain(&self, domain: Domain) -> Result<()> {
        if self.domains.read().contains_key(&domain.name) {
            return Err(RegistryError::DomainExists(domain.name).into());
        }
        self.save_domain(&domain)
    }

    /// Move a removed domain's record out of the live namespace; its
    /// ordinal is never reassigned.
    pub fn retire_domain(&self, name: &str) -> Result<()> {
        let from = format!("domain/{}", name);
        let to = format!("domain/{}.removed", name);
        self.storage.rename(&from, &to)?;
        self.domains.write().remove(name);
        info!(domain = name, "domain retired");
        Ok(())
    }

    /// Fill or clear the lord slot. The assignee must already be a member.
    pub fn set_domain_lord(&self, domain_name: &str, lord: Option<&str>) -> Result<()> {
        let mut domain = self
            .lookup_domain(domain_name)
            .ok_or_else(|| RegistryError::UnknownDomain(domain_name.to_string()))?;
        if let Some(name) = lord {
            if !domain.is_member(name) {
                return Err(RegistryError::NotAMember {
                    name: name.to_string(),
                    domain: domain_name.to_string(),
                }
                .into());
            }
        }
        domain.lord = lord.map(String::from);
        self.save_domain(&domain)
    }

    /// Fill or clear the steward slot. The assignee must already be a
    /// member.
    pub fn set_domain_steward(&self, domain_name: &str, steward: Option<&str>) -> Result<()> {
        let mut domain = self
            .lookup_domain(domain_name)
            .ok_or_else(|| RegistryError::UnknownDomain(domain_name.to_string()))?;
        if let Some(name) = steward {
            if !domain.is_member(name) {
                return Err(RegistryError::NotAMember {
                    name: name.to_string(),
                    domain: domain_name.to_string(),
                }
                .into());
            }
        }
        domain.steward = steward.map(String::from);
        self.save_domain(&domain)
    }

    pub fn add_application(&self, domain_name: &str, name: &str) -> Result<()> {
        let mut domain = self
            .lookup_domain(domain_name)
            .ok_or_else(|| RegistryError::UnknownDomain(domain_name.to_string()))?;
        domain.applications.insert(name.to_string());
        self.save_domain(&domain)
    }

    pub fn remove_application(&self, domain_name: &str, name: &str) -> Result<bool> {
        let mut domain = self
            .lookup_domain(domain_name)
            .ok_or_else(|| RegistryError::UnknownDomain(domain_name.to_string()))?;
        let removed = domain.applications.remove(name);
        if removed {
            self.save_domain(&domain)?;
        }
        Ok(removed)
    }

    pub fn add_experience(&self, domain_name: &str, delta: i64) -> Result<()> {
        let mut domain = self
            .lookup_domain(domain_name)
            .ok_or_else(|| RegistryError::UnknownDomain(domain_name.to_string()))?;
        domain.experience += delta;
        self.save_domain(&domain)
    }

    pub fn count_command(&self, domain_name: &str) -> Result<()> {
        let mut domain = self
            .lookup_domain(domain_name)
            .ok_or_else(|| RegistryError::UnknownDomain(domain_name.to_string()))?;
        domain.commands += 1;
        self.save_domain(&domain)
    }

    // ---- shared tables ----

    pub fn add_global_read(&self, name: &str) -> Result<()> {
        let mut meta = self.meta.read().clone();
        meta.global_read.insert(name.to_string());
        self.save_meta(&meta)
    }

    pub fn remove_global_read(&self, name: &str) -> Result<()> {
        let mut meta = self.meta.read().clone();
        meta.global_read.remove(name);
        self.save_meta(&meta)
    }

    /// Replace a team roster; an empty roster removes the team.
    pub fn set_team(&self, team: &str, members: BTreeSet<String>) -> Result<()> {
        let mut meta = self.meta.read().clone();
        if members.is_empty() {
            meta.teams.remove(team);
        } else {
            meta.teams.insert(team.to_string(), members);
        }
        self.save_meta(&meta)
    }
}
