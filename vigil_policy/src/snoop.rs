//! Snoop decisions.
//!
//! Snooping is the one permission that names principals instead of
//! paths. Three request shapes share the validity chain: breaking an
//! existing snoop, an administrator force-setting one principal onto
//! another, and the ordinary self-initiated request. Refusals are quiet
//! toward the requester but land in the snoop audit trail.

use tracing::warn;

use vigil_core::{names, Rank, Restriction, SanctionKind, VPath};
use vigil_registry::SNOOP_STREAM;

use crate::engine::DecisionEngine;

impl DecisionEngine {
    /// Decide a snoop request.
    ///
    /// With `snoopee` absent the request breaks the snoop currently held
    /// by `snooper`. With `initiator != snooper` an administrator is
    /// force-setting `snooper` onto `snoopee`.
    pub fn can_snoop(&self, initiator: &str, snooper: &str, snoopee: Option<&str>) -> bool {
        let allowed = match snoopee {
            None => initiator == snooper || self.snoop_chain(initiator, snooper),
            Some(target) if initiator != snooper => self.force_snoop(initiator, snooper, target),
            Some(target) => self.snoop_chain(snooper, target),
        };
        if !allowed {
            warn!(initiator, snooper, ?snoopee, "snoop refused");
            if let Err(err) = self.audit.append(
                SNOOP_STREAM,
                initiator,
                format!("refused: {} on {}", snooper, snoopee.unwrap_or("<break>")),
            ) {
                warn!(%err, "snoop audit append failed");
            }
        }
        allowed
    }

    /// Force-setting requires administrative standing, a target that is
    /// not already snooped, and a snooper who could validly snoop the
    /// target on their own.
    fn force_snoop(&self, initiator: &str, snooper: &str, target: &str) -> bool {
        self.is_admin(initiator)
            && self.world.snooper_of(target).is_none()
            && self.snoop_chain(snooper, target)
    }

    /// The ordinary validity chain, in precedence order.
    fn snoop_chain(&self, snooper: &str, target: &str) -> bool {
        if target == snooper {
            return false;
        }
        if snooper == names::ROOT_NAME {
            return true;
        }
        let snooper_rank = self.registry.rank_of(snooper);
        if snooper_rank == Rank::Mortal {
            return false;
        }
        let restrictions = self.registry.restriction_of(snooper);
        if restrictions.contains(Restriction::NO_SNOOP) {
            return false;
        }

        let target_rank = self.registry.rank_of(target);
        // Officers watch their own domain's juniors and any apprentice.
        if let Some(domain) = self.registry.officer_of(snooper) {
            if target_rank == Rank::Apprentice {
                return true;
            }
            if self.registry.domain_of(target).as_deref() == Some(domain.as_str())
                && target_rank < snooper_rank
            {
                return true;
            }
        }
        if snooper_rank >= Rank::Arch && target_rank < Rank::Arch {
            return true;
        }
        if restrictions.contains(Restriction::SNOOP_DOMAIN_ONLY)
            && self.registry.domain_of(snooper) != self.registry.domain_of(target)
        {
            return false;
        }
        if target_rank == Rank::Mortal {
            if snooper_rank >= Rank::Lord {
                return true;
            }
            if !self.world.in_protected_location(target) {
                return true;
            }
            // A protected mortal falls through to explicit rights.
        }
        if self
            .sanctions
            .exists(target, snooper, SanctionKind::Snoop, &VPath::root())
        {
            return true;
        }
        self.registry.mentor_of(target).as_deref() == Some(snooper)
    }
}
