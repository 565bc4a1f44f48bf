//! Two-step confirmation of destructive administrative actions.
//!
//! Removing a domain or demoting a wizard is refused on the first request
//! and armed instead; repeating the identical request within the window
//! goes through. Pending confirmations are volatile; a restart clears
//! them.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::debug;

/// How long an armed confirmation stays valid.
pub const DEFAULT_WINDOW_SECS: i64 = 60;

#[derive(Default)]
pub struct Confirmations {
    pending: RwLock<HashMap<(String, String), DateTime<Utc>>>,
}

impl Confirmations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `action` for `actor`. Returns the deadline.
    pub fn begin(&self, actor: &str, action: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        let deadline = now + Duration::seconds(DEFAULT_WINDOW_SECS);
        self.pending
            .write()
            .insert((actor.to_string(), action.to_string()), deadline);
        debug!(actor, action, "confirmation armed");
        deadline
    }

    /// Consume an armed confirmation. Returns `false` if it was never
    /// armed or the window has passed.
    pub fn confirm(&self, actor: &str, action: &str, now: DateTime<Utc>) -> bool {
        let key = (actor.to_string(), action.to_string());
        let mut pending = self.pending.write();
        match pending.remove(&key) {
            Some(deadline) if now <= deadline => true,
            Some(_) => false,
            None => false,
        }
    }

    pub fn purge_expired(&self, now: DateTime<Utc>) {
        self.pending.write().retain(|_, deadline| now <= *deadline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_then_confirm() {
        let confirmations = Confirmations::new();
        let now = Utc::now();
        confirmations.begin("root", "remove-domain Acme", now);
        assert!(confirmations.confirm("root", "remove-domain Acme", now + Duration::seconds(5)));
        // Consumed.
        assert!(!confirmations.confirm("root", "remove-domain Acme", now + Duration::seconds(6)));
    }

    #[test]
    fn test_window_expiry() {
        let confirmations = Confirmations::new();
        let now = Utc::now();
        confirmations.begin("root", "demote mira", now);
        assert!(!confirmations.confirm("root", "demote mira", now + Duration::seconds(120)));
    }

    #[test]
    fn test_actor_and_action_must_match() {
        let confirmations = Confirmations::new();
        let now = Utc::now();
        confirmations.begin("root", "demote mira", now);
        assert!(!confirmations.confirm("arch", "demote mira", now));
        assert!(!confirmations.confirm("root", "demote norm", now));
        assert!(confirmations.confirm("root", "demote mira", now));
    }

    #[test]
    fn test_purge_expired() {
        let confirmations = Confirmations::new();
        let now = Utc::now();
        confirmations.begin("root", "a", now);
        confirmations.purge_expired(now + Duration::seconds(120));
        assert!(!confirmations.confirm("root", "a", now + Duration::seconds(1)));
    }
}
