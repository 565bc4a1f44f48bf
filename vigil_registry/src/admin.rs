//! Administrative operations.
//!
//! Every mutation of the world's authority structure funnels through
//! [`Administration`]: rank changes, domain lifecycle, officer
//! appointments, applications, sanctions on behalf of others, sitebans
//! and restriction flags. Each operation checks the actor's standing
//! first, then drives the underlying stores in an order that keeps the
//! cascades (office slots, holding-domain moves, sanction cleanup)
//! consistent, and finally records the action in the audit trail.
//!
//! Destructive operations (demoting a wizard to mortal, removing a
//! domain) are two-step: the first identical request arms a confirmation
//! and fails, the second within the window goes through.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use vigil_core::error::{AdminError, RegistryError, Result};
use vigil_core::storage::Storage;
use vigil_core::{names, Rank, Restriction, SanctionKind, VPath};
use vigil_sanction::SanctionStore;

use crate::audit::{AuditLog, ADMIN_STREAM};
use crate::confirm::Confirmations;
use crate::domain::Domain;
use crate::registry::Registry;
use crate::siteban::{BanKind, SitebanGate};

pub struct Administration {
    registry: Arc<Registry>,
    sanctions: Arc<SanctionStore>,
    siteban: Arc<SitebanGate>,
    audit: Arc<AuditLog>,
    confirmations: Confirmations,
    storage: Arc<dyn Storage>,
}

impl Administration {
    pub fn new(
        registry: Arc<Registry>,
        sanctions: Arc<SanctionStore>,
        siteban: Arc<SitebanGate>,
        audit: Arc<AuditLog>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            registry,
            sanctions,
            siteban,
            audit,
            confirmations: Confirmations::new(),
            storage,
        }
    }

    // ---- standing checks ----

    /// Administrative standing: the root principal, or arch rank and up.
    fn require_admin(&self, actor: &str, action: &str) -> Result<()> {
        if actor == names::ROOT_NAME || self.registry.rank_of(actor) >= Rank::Arch {
            return Ok(());
        }
        warn!(actor, action, "administrative action refused");
        Err(AdminError::NotAuthorized {
            actor: actor.to_string(),
            action: action.to_string(),
        }
        .into())
    }

    /// Officer standing over `domain`: its lord or steward, or an admin.
    fn require_officer(&self, actor: &str, domain: &Domain, action: &str) -> Result<()> {
        if domain.is_officer(actor) {
            return Ok(());
        }
        self.require_admin(actor, action)
    }

    /// Standing to manage sanctions given by `giver`: the giver itself, an
    /// officer of the giver when the giver is a domain, or an admin.
    fn require_sanction_standing(&self, actor: &str, giver: &str) -> Result<()> {
        if actor == giver {
            return Ok(());
        }
        if let Some(domain) = self.registry.lookup_domain(giver) {
            if domain.is_officer(actor) {
                return Ok(());
            }
        }
        self.require_admin(actor, &format!("manage sanctions given by {}", giver))
    }

    /// Consume an armed confirmation for `action`, arming one if absent.
    fn require_confirmation(&self, actor: &str, action: &str) -> Result<()> {
        let now = Utc::now();
        if self.confirmations.confirm(actor, action, now) {
            return Ok(());
        }
        self.confirmations.begin(actor, action, now);
        Err(AdminError::ConfirmationMissing(action.to_string()).into())
    }

    fn record(&self, actor: &str, message: String) -> Result<()> {
        self.audit.append(ADMIN_STREAM, actor, message)
    }

    // ---- rank lifecycle ----

    /// Promote a mortal into the apprentice rank, creating the principal
    /// record and home area. If any later step fails the half-created
    /// record is discarded so no orphan remains.
    pub fn promote_mortal(&self, actor: &str, name: &str) -> Result<()> {
        self.require_admin(actor, &format!("promote {}", name))?;
        self.registry.create_principal(name)?;
        if let Err(err) = self.finish_promotion(name) {
            // Roll back; the original error is the one worth reporting.
            let _ = self.registry.discard_principal(name);
            return Err(err);
        }
        self.record(actor, format!("promoted {} to apprentice", name))?;
        Ok(())
    }

    fn finish_promotion(&self, name: &str) -> Result<()> {
        self.registry.set_rank(name, Rank::Apprentice)?;
        self.ensure_home(name)
    }

    /// Make sure the principal's home area marker document exists.
    fn ensure_home(&self, name: &str) -> Result<()> {
        let key = format!("home/{}", name);
        if self.storage.load(&key)?.is_some() {
            return Ok(());
        }
        let marker = serde_json::json!({
            "owner": name,
            "created": Utc::now(),
        });
        self.storage.save(&key, &marker)?;
        Ok(())
    }

    /// Change a principal's rank along a legal transition edge. Setting
    /// rank to lord requires a domain affiliation and installs the
    /// assignee as that domain's lord, demoting any predecessor to
    /// normal. Setting rank to mortal is the full demotion cascade.
    pub fn set_rank(&self, actor: &str, name: &str, to: Rank) -> Result<()> {
        self.require_admin(actor, &format!("set rank of {}", name))?;
        if to == Rank::Mortal {
            return self.demote_mortal(actor, name);
        }

        let principal = self
            .registry
            .lookup_principal(name)
            .ok_or_else(|| RegistryError::UnknownPrincipal(name.to_string()))?;
        let from = principal.rank;

        if to == Rank::Lord {
            let domain_name = principal
                .domain
                .clone()
                .ok_or_else(|| RegistryError::NoAffiliation(name.to_string()))?;
            self.registry.set_rank(name, to)?;
            self.install_lord(&domain_name, name)?;
        } else {
            self.registry.set_rank(name, to)?;
            // Dropping below an office rank vacates the slot.
            if to < from {
                self.vacate_offices(name)?;
            }
        }
        self.record(actor, format!("rank of {}: {} -> {}", name, from, to))?;
        Ok(())
    }

    fn install_lord(&self, domain_name: &str, name: &str) -> Result<()> {
        if let Some(domain) = self.registry.lookup_domain(domain_name) {
            if let Some(old) = domain.lord.as_deref().filter(|old| *old != name) {
                self.registry.set_rank(old, Rank::Normal)?;
            }
            if domain.steward.as_deref() == Some(name) {
                self.registry.set_domain_steward(domain_name, None)?;
            }
        }
        self.registry.set_domain_lord(domain_name, Some(name))
    }

    fn vacate_offices(&self, name: &str) -> Result<()> {
        let Some(domain_name) = self.registry.officer_of(name) else {
            return Ok(());
        };
        let Some(domain) = self.registry.lookup_domain(&domain_name) else {
            return Ok(());
        };
        if domain.lord.as_deref() == Some(name) {
            self.registry.set_domain_lord(&domain_name, None)?;
        }
        if domain.steward.as_deref() == Some(name) {
            self.registry.set_domain_steward(&domain_name, None)?;
        }
        Ok(())
    }

    /// The full demotion cascade: rank drops to mortal, the domain and
    /// any office are left behind, mentor links are severed in both
    /// directions, every sanction given or received disappears, and the
    /// record is renamed out of the live namespace.
    fn demote_mortal(&self, actor: &str, name: &str) -> Result<()> {
        let principal = self
            .registry
            .lookup_principal(name)
            .ok_or_else(|| RegistryError::UnknownPrincipal(name.to_string()))?;
        self.require_confirmation(actor, &format!("demote {}", name))?;

        let from = principal.rank;
        self.registry.set_rank(name, Rank::Mortal)?;
        self.registry.leave_domain(name)?;
        self.registry.clear_mentor(name)?;
        for student in self.registry.students_of(name) {
            self.registry.clear_mentor(&student)?;
        }
        self.sanctions.revoke_all(name)?;
        self.sanctions.revoke_received(name)?;
        self.registry.retire_principal(name)?;

        info!(name, %from, "wizard demoted to mortal");
        self.record(actor, format!("demoted {} ({}) to mortal", name, from))?;
        Ok(())
    }

    // ---- domain lifecycle ----

    /// Create a domain with `lord` as its founding lord. The founder must
    /// be unaffiliated and hold (or be able to reach) the lord rank.
    pub fn make_domain(&self, actor: &str, name: &str, code: &str, lord: &str) -> Result<()> {
        self.require_admin(actor, &format!("create domain {}", name))?;
        let principal = self
            .registry
            .lookup_principal(lord)
            .ok_or_else(|| RegistryError::UnknownPrincipal(lord.to_string()))?;
        if let Some(current) = principal.domain.clone() {
            return Err(RegistryError::AlreadyAffiliated {
                name: lord.to_string(),
                domain: current,
            }
            .into());
        }
        if principal.rank != Rank::Lord && !principal.rank.can_transition(Rank::Lord) {
            return Err(RegistryError::InvalidTransition {
                from: principal.rank,
                to: Rank::Lord,
            }
            .into());
        }

        let number = self.registry.next_domain_number()?;
        self.registry.create_domain(Domain::new(name, code, number)?)?;
        self.registry.join_domain(lord, name)?;
        if principal.rank != Rank::Lord {
            self.registry.set_rank(lord, Rank::Lord)?;
        }
        self.registry.set_domain_lord(name, Some(lord))?;

        info!(domain = name, number, lord, "domain created");
        self.record(actor, format!("created domain {} ({}) under {}", name, code, lord))?;
        Ok(())
    }

    /// Remove a domain. Members are demoted to apprentice where a legal
    /// edge exists, moved into the wizard holding domain, and the
    /// domain's sanctions vanish in both directions.
    pub fn remove_domain(&self, actor: &str, name: &str) -> Result<()> {
        self.require_admin(actor, &format!("remove domain {}", name))?;
        if name == names::BASE_DOMAIN || name == names::WIZARD_DOMAIN {
            return Err(AdminError::ReservedDomain(name.to_string()).into());
        }
        let domain = self
            .registry
            .lookup_domain(name)
            .ok_or_else(|| RegistryError::UnknownDomain(name.to_string()))?;
        self.require_confirmation(actor, &format!("remove domain {}", name))?;

        for member in domain.members.iter() {
            let rank = self.registry.rank_of(member);
            if rank > Rank::Apprentice && rank.can_transition(Rank::Apprentice) {
                self.registry.set_rank(member, Rank::Apprentice)?;
            }
            self.registry.leave_domain(member)?;
            self.registry.join_domain(member, names::WIZARD_DOMAIN)?;
        }
        self.sanctions.revoke_all(name)?;
        self.sanctions.revoke_received(name)?;
        self.registry.retire_domain(name)?;

        info!(domain = name, members = domain.members.len(), "domain removed");
        self.record(actor, format!("removed domain {}", name))?;
        Ok(())
    }

    /// Install a new lord, demoting the predecessor to normal.
    pub fn set_lord(&self, actor: &str, domain_name: &str, name: &str) -> Result<()> {
        self.require_admin(actor, &format!("appoint lord of {}", domain_name))?;
        let principal = self
            .registry
            .lookup_principal(name)
            .ok_or_else(|| RegistryError::UnknownPrincipal(name.to_string()))?;
        if principal.domain.as_deref() != Some(domain_name) {
            return Err(RegistryError::NotAMember {
                name: name.to_string(),
                domain: domain_name.to_string(),
            }
            .into());
        }
        if principal.rank != Rank::Lord {
            self.registry.set_rank(name, Rank::Lord)?;
        }
        self.install_lord(domain_name, name)?;
        self.record(actor, format!("{} is now lord of {}", name, domain_name))?;
        Ok(())
    }

    /// Install a new steward. The domain's lord may do this too.
    pub fn set_steward(&self, actor: &str, domain_name: &str, name: &str) -> Result<()> {
        let domain = self
            .registry
            .lookup_domain(domain_name)
            .ok_or_else(|| RegistryError::UnknownDomain(domain_name.to_string()))?;
        if domain.lord.as_deref() != Some(actor) {
            self.require_admin(actor, &format!("appoint steward of {}", domain_name))?;
        }
        let principal = self
            .registry
            .lookup_principal(name)
            .ok_or_else(|| RegistryError::UnknownPrincipal(name.to_string()))?;
        if principal.domain.as_deref() != Some(domain_name) {
            return Err(RegistryError::NotAMember {
                name: name.to_string(),
                domain: domain_name.to_string(),
            }
            .into());
        }

        if let Some(old) = domain.steward.as_deref().filter(|old| *old != name) {
            if self.registry.rank_of(old) == Rank::Steward {
                self.registry.set_rank(old, Rank::Normal)?;
            }
        }
        if principal.rank != Rank::Steward && principal.rank.can_transition(Rank::Steward) {
            self.registry.set_rank(name, Rank::Steward)?;
        }
        self.registry.set_domain_steward(domain_name, Some(name))?;
        self.record(actor, format!("{} is now steward of {}", name, domain_name))?;
        Ok(())
    }

    // ---- applications ----

    /// A principal asks to join a domain. Applying is self-service.
    pub fn apply_to_domain(&self, name: &str, domain_name: &str) -> Result<()> {
        if self.registry.lookup_principal(name).is_none() {
            return Err(RegistryError::UnknownPrincipal(name.to_string()).into());
        }
        self.registry.add_application(domain_name, name)
    }

    /// An officer accepts a pending application; the applicant joins.
    pub fn accept_application(&self, actor: &str, domain_name: &str, name: &str) -> Result<()> {
        let domain = self
            .registry
            .lookup_domain(domain_name)
            .ok_or_else(|| RegistryError::UnknownDomain(domain_name.to_string()))?;
        self.require_officer(actor, &domain, &format!("accept application to {}", domain_name))?;
        if !self.registry.remove_application(domain_name, name)? {
            return Err(AdminError::NoApplication {
                name: name.to_string(),
                domain: domain_name.to_string(),
            }
            .into());
        }
        self.registry.join_domain(name, domain_name)?;
        self.record(actor, format!("accepted {} into {}", name, domain_name))?;
        Ok(())
    }

    pub fn deny_application(&self, actor: &str, domain_name: &str, name: &str) -> Result<()> {
        let domain = self
            .registry
            .lookup_domain(domain_name)
            .ok_or_else(|| RegistryError::UnknownDomain(domain_name.to_string()))?;
        self.require_officer(actor, &domain, &format!("deny application to {}", domain_name))?;
        if !self.registry.remove_application(domain_name, name)? {
            return Err(AdminError::NoApplication {
                name: name.to_string(),
                domain: domain_name.to_string(),
            }
            .into());
        }
        self.record(actor, format!("denied {} entry to {}", name, domain_name))?;
        Ok(())
    }

    // ---- sanctions ----

    pub fn grant_sanction(
        &self,
        actor: &str,
        giver: &str,
        receiver: &str,
        kind: SanctionKind,
        scope: &VPath,
    ) -> Result<()> {
        self.require_sanction_standing(actor, giver)?;
        self.sanctions.grant(giver, receiver, kind, scope)?;
        self.record(
            actor,
            format!("sanction {} {} -> {} at {}", kind, giver, receiver, scope),
        )?;
        Ok(())
    }

    pub fn revoke_sanction(
        &self,
        actor: &str,
        giver: &str,
        receiver: &str,
        kind: SanctionKind,
        scope: &VPath,
    ) -> Result<()> {
        self.require_sanction_standing(actor, giver)?;
        self.sanctions.revoke(giver, receiver, kind, scope)?;
        self.record(
            actor,
            format!("revoked sanction {} {} -> {} at {}", kind, giver, receiver, scope),
        )?;
        Ok(())
    }

    /// Drop everything `giver` ever granted.
    pub fn clear_sanctions(&self, actor: &str, giver: &str) -> Result<()> {
        self.require_sanction_standing(actor, giver)?;
        self.sanctions.revoke_all(giver)?;
        self.record(actor, format!("cleared every sanction given by {}", giver))?;
        Ok(())
    }

    // ---- sitebans and restrictions ----

    pub fn add_siteban(
        &self,
        actor: &str,
        pattern: &str,
        kind: BanKind,
        reason: &str,
    ) -> Result<()> {
        self.require_admin(actor, &format!("siteban {}", pattern))?;
        self.siteban.add(actor, pattern, kind, reason)
    }

    pub fn remove_siteban(&self, actor: &str, pattern: &str) -> Result<()> {
        self.require_admin(actor, &format!("remove siteban {}", pattern))?;
        self.siteban.remove(actor, pattern)
    }

    pub fn set_restriction(&self, actor: &str, name: &str, restrictions: Restriction) -> Result<()> {
        self.require_admin(actor, &format!("restrict {}", name))?;
        self.registry.set_restriction(name, restrictions)?;
        self.record(actor, format!("restrictions of {} set to {}", name, restrictions))?;
        Ok(())
    }

    // ---- mentor links and shared tables ----

    /// Register a mentor for a student. The mentor may do this for
    /// themselves; anyone else needs admin standing.
    pub fn assign_mentor(&self, actor: &str, student: &str, mentor: &str) -> Result<()> {
        if actor != mentor {
            self.require_admin(actor, &format!("assign mentor to {}", student))?;
        }
        self.registry.set_mentor(student, mentor)?;
        self.record(actor, format!("{} now mentors {}", mentor, student))?;
        Ok(())
    }

    /// Sever a mentor link. The mentor may release their own student.
    pub fn dismiss_student(&self, actor: &str, student: &str) -> Result<()> {
        if self.registry.mentor_of(student).as_deref() != Some(actor) {
            self.require_admin(actor, &format!("dismiss mentor of {}", student))?;
        }
        self.registry.clear_mentor(student)?;
        self.record(actor, format!("mentor link of {} severed", student))?;
        Ok(())
    }

    pub fn set_global_read(&self, actor: &str, name: &str, enabled: bool) -> Result<()> {
        self.require_admin(actor, &format!("set global read for {}", name))?;
        if enabled {
            self.registry.add_global_read(name)?;
        } else {
            self.registry.remove_global_read(name)?;
        }
        self.record(
            actor,
            format!("global read for {}: {}", name, if enabled { "on" } else { "off" }),
        )?;
        Ok(())
    }

    pub fn set_team(
        &self,
        actor: &str,
        team: &str,
        members: std::collections::BTreeSet<String>,
    ) -> Result<()> {
        self.require_admin(actor, &format!("set team {}", team))?;
        self.registry.set_team(team, members.clone())?;
        self.record(actor, format!("team {} now has {} members", team, members.len()))?;
        Ok(())
    }
}
