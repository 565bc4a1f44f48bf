//! The permission decision engine.
//!
//! Every read and write attempt against the virtual namespace funnels
//! through [`DecisionEngine::decide`], which resolves the path to a
//! reserved area once and then walks a fixed precedence chain: self and
//! root, administrators, organizational officers, reserved sub-areas,
//! explicit sanctions, domain membership, and finally the read-only
//! fallbacks. Denials are ordinary `false` returns, never errors.

use std::sync::Arc;

use tracing::trace;

use vigil_core::{names, AccessKind, Area, Rank, SanctionKind, VPath};
use vigil_registry::{AuditLog, Registry};
use vigil_sanction::SanctionStore;

use crate::world::WorldProbe;

pub struct DecisionEngine {
    pub(crate) registry: Arc<Registry>,
    pub(crate) sanctions: Arc<SanctionStore>,
    pub(crate) audit: Arc<AuditLog>,
    pub(crate) world: Arc<dyn WorldProbe>,
}

/// Rebuild a scope path from the tail of an already-validated path.
fn scope(rest: &[String]) -> VPath {
    VPath::from_segments(rest.iter().cloned()).unwrap_or_default()
}

impl DecisionEngine {
    pub fn new(
        registry: Arc<Registry>,
        sanctions: Arc<SanctionStore>,
        audit: Arc<AuditLog>,
        world: Arc<dyn WorldProbe>,
    ) -> Self {
        Self {
            registry,
            sanctions,
            audit,
            world,
        }
    }

    // ---- public query surface ----

    pub fn can_read(&self, actor: &str, path: &VPath) -> bool {
        self.decide(actor, AccessKind::Read, path)
    }

    pub fn can_write(&self, actor: &str, path: &VPath) -> bool {
        self.decide(actor, AccessKind::Write, path)
    }

    /// Metadata-only queries sit outside the precedence chain entirely.
    pub fn can_stat(&self, _actor: &str, _path: &VPath) -> bool {
        true
    }

    /// Administrative shortcut shared by every area: the root identity
    /// and arch rank and above pass everything.
    pub(crate) fn is_admin(&self, actor: &str) -> bool {
        actor == names::ROOT_NAME || self.registry.rank_of(actor) >= Rank::Arch
    }

    fn decide(&self, actor: &str, op: AccessKind, path: &VPath) -> bool {
        let write = matches!(op, AccessKind::Write);
        let allowed = self.decide_inner(actor, write, path);
        trace!(actor, ?op, path = %path, allowed, "access decided");
        allowed
    }

    fn decide_inner(&self, actor: &str, write: bool, path: &VPath) -> bool {
        if self.is_admin(actor) {
            return true;
        }
        // An unidentified actor may read the root path and nothing else.
        if actor.is_empty() {
            return !write && path.is_root();
        }

        match Area::resolve(path) {
            Area::Domains { domain, rest } => self.decide_domain(actor, write, domain, rest),
            Area::Home { owner, rest } => self.decide_home(actor, write, owner, rest),
            Area::SysLog { rest } => self.decide_syslog(actor, rest),
            // Unrecognized areas and the root itself: world-readable,
            // never writable.
            Area::Root | Area::Other => !write,
        }
    }

    // ---- the domains area ----

    fn decide_domain(&self, actor: &str, write: bool, domain: &str, rest: &[String]) -> bool {
        let kind = if write {
            SanctionKind::Write
        } else {
            SanctionKind::Read
        };

        if let Some(record) = self.registry.lookup_domain(domain) {
            if record.is_officer(actor) {
                return true;
            }
        }

        // The team sub-area of the base domain is closed to everyone but
        // declared team members and the team identity itself.
        if domain == names::BASE_DOMAIN && rest.first().map(String::as_str) == Some(names::TEAM_DIR)
        {
            return match rest.get(1) {
                Some(team) => actor == team || self.registry.is_team_member(team, actor),
                None => false,
            };
        }

        // A domain acting on its own area; the holding domain never gets
        // this bulk right.
        if actor == domain && domain != names::WIZARD_DOMAIN {
            return true;
        }

        match rest.first().map(String::as_str) {
            Some(names::OPEN_DIR) => return true,
            Some(names::PRIVATE_DIR) => return self.private_carveout(actor, rest),
            _ => {}
        }

        if self.sanctions.exists(domain, actor, kind, &scope(rest)) {
            return true;
        }

        // Ordinary membership; write access does not come with membership
        // of the holding domain.
        if self.registry.domain_of(actor).as_deref() == Some(domain)
            && !(write && domain == names::WIZARD_DOMAIN)
        {
            return true;
        }

        if write {
            return false;
        }
        if self.registry.is_global_read(actor) || self.registry.in_any_team(actor) {
            return true;
        }
        self.registry.rank_of(actor) >= Rank::Mage
    }

    /// The private sub-area is closed, with one carve-out: a registered
    /// mentor reaches their own student's file under
    /// `private/restrictlog`.
    fn private_carveout(&self, actor: &str, rest: &[String]) -> bool {
        if rest.get(1).map(String::as_str) != Some(names::RESTRICTLOG_DIR) {
            return false;
        }
        match rest.get(2) {
            Some(student) => self.registry.mentor_of(student).as_deref() == Some(actor),
            None => false,
        }
    }

    // ---- the wizard-home area ----

    fn decide_home(&self, actor: &str, write: bool, owner: &str, rest: &[String]) -> bool {
        let kind = if write {
            SanctionKind::Write
        } else {
            SanctionKind::Read
        };

        if actor == owner || self.registry.mentor_of(owner).as_deref() == Some(actor) {
            return true;
        }
        // The lord of the owner's domain oversees the home.
        if let Some(domain) = self.registry.domain_of(owner) {
            if let Some(record) = self.registry.lookup_domain(&domain) {
                if record.lord.as_deref() == Some(actor) {
                    return true;
                }
            }
        }

        match rest.first().map(String::as_str) {
            Some(names::OPEN_DIR) => return true,
            // Private is the owner's alone; the owner returned above.
            Some(names::PRIVATE_DIR) => return false,
            _ => {}
        }

        if self.sanctions.exists(owner, actor, kind, &scope(rest)) {
            return true;
        }

        if write {
            return false;
        }
        self.registry.is_global_read(actor) || self.registry.in_any_team(actor)
    }

    // ---- the system log area ----

    fn decide_syslog(&self, actor: &str, rest: &[String]) -> bool {
        if rest.first().map(String::as_str) != Some(names::LOG_DIR) {
            return true;
        }
        if self.registry.is_team_member(names::OVERSIGHT_TEAM, actor) {
            return true;
        }
        // Domain officers reach a fixed allow-list of log categories.
        let officer = self.registry.officer_of(actor).is_some();
        match rest.get(1) {
            Some(category) => {
                officer && names::OFFICER_LOG_CATEGORIES.contains(&category.as_str())
            }
            None => false,
        }
    }
}
