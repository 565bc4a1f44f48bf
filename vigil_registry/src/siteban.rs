//! The siteban gate.
//!
//! Bans connecting addresses by wildcard pattern before any principal is
//! involved. Two severities exist: a full login ban and a ban on creating
//! new characters only. When several patterns match an address the most
//! restrictive one wins.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use vigil_core::error::{BanError, Result, StorageError};
use vigil_core::storage::Storage;

use crate::audit::{AuditLog, SITEBAN_STREAM};

const SITEBAN_KEY: &str = "siteban";

/// Severity of an address ban.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BanKind {
    /// Connections from the address are refused outright.
    NoLogin,
    /// Existing characters may log in; new ones may not be created.
    NoNewCharacter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitebanEntry {
    pub pattern: String,
    pub kind: BanKind,
    pub issuer: String,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

pub struct SitebanGate {
    storage: Arc<dyn Storage>,
    audit: Arc<AuditLog>,
    entries: RwLock<BTreeMap<String, SitebanEntry>>,
}

/// Match `address` against `pattern`, where `*` matches any run of
/// characters and `?` matches exactly one.
fn matches(pattern: &str, address: &str) -> bool {
    fn inner(pattern: &[u8], address: &[u8]) -> bool {
        match (pattern.first(), address.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                inner(&pattern[1..], address)
                    || (!address.is_empty() && inner(pattern, &address[1..]))
            }
            (Some(b'?'), Some(_)) => inner(&pattern[1..], &address[1..]),
            (Some(p), Some(a)) if p == a => inner(&pattern[1..], &address[1..]),
            _ => false,
        }
    }
    inner(pattern.as_bytes(), address.as_bytes())
}

fn valid_pattern(pattern: &str) -> bool {
    !pattern.is_empty()
        && pattern
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-' | '*' | '?'))
}

impl SitebanGate {
    pub fn open(storage: Arc<dyn Storage>, audit: Arc<AuditLog>) -> Result<Self> {
        let entries: BTreeMap<String, SitebanEntry> = match storage.load(SITEBAN_KEY)? {
            Some(value) => serde_json::from_value(value).map_err(StorageError::Serde)?,
            None => BTreeMap::new(),
        };
        Ok(Self {
            storage,
            audit,
            entries: RwLock::new(entries),
        })
    }

    fn persist(&self, entries: &BTreeMap<String, SitebanEntry>) -> Result<()> {
        let value = serde_json::to_value(entries).map_err(StorageError::Serde)?;
        self.storage.save(SITEBAN_KEY, &value)?;
        *self.entries.write() = entries.clone();
        Ok(())
    }

    /// Record a new ban. Refuses a pattern that is already banned;
    /// changing severity requires removing the old entry first.
    pub fn add(
        &self,
        issuer: &str,
        pattern: &str,
        kind: BanKind,
        reason: &str,
    ) -> Result<()> {
        if !valid_pattern(pattern) {
            return Err(BanError::InvalidPattern(pattern.to_string()).into());
        }
        let mut entries = self.entries.read().clone();
        if entries.contains_key(pattern) {
            return Err(BanError::DuplicatePattern(pattern.to_string()).into());
        }
        entries.insert(
            pattern.to_string(),
            SitebanEntry {
                pattern: pattern.to_string(),
                kind,
                issuer: issuer.to_string(),
                timestamp: Utc::now(),
                reason: reason.to_string(),
            },
        );
        self.persist(&entries)?;
        self.audit.append(
            SITEBAN_STREAM,
            issuer,
            format!("banned {} ({:?}): {}", pattern, kind, reason),
        )?;
        info!(pattern, ?kind, issuer, "siteban added");
        Ok(())
    }

    pub fn remove(&self, issuer: &str, pattern: &str) -> Result<()> {
        let mut entries = self.entries.read().clone();
        if entries.remove(pattern).is_none() {
            return Err(BanError::UnknownPattern(pattern.to_string()).into());
        }
        self.persist(&entries)?;
        self.audit
            .append(SITEBAN_STREAM, issuer, format!("unbanned {}", pattern))?;
        info!(pattern, issuer, "siteban removed");
        Ok(())
    }

    /// The effective ban for `address`, most restrictive match first.
    pub fn check(&self, address: &str) -> Option<BanKind> {
        let entries = self.entries.read();
        let mut found = None;
        for entry in entries.values() {
            if !matches(&entry.pattern, address) {
                continue;
            }
            if entry.kind == BanKind::NoLogin {
                return Some(BanKind::NoLogin);
            }
            found = Some(BanKind::NoNewCharacter);
        }
        found
    }

    /// The most specific entry matching `address`, for display. Among
    /// matching patterns the one with the most literal characters wins.
    pub fn find(&self, address: &str) -> Option<SitebanEntry> {
        let entries = self.entries.read();
        entries
            .values()
            .filter(|e| matches(&e.pattern, address))
            .max_by_key(|e| {
                e.pattern
                    .chars()
                    .filter(|c| !matches!(c, '*' | '?'))
                    .count()
            })
            .cloned()
    }

    /// Every entry, optionally narrowed to one severity, for display.
    pub fn list(&self, kind: Option<BanKind>) -> Vec<SitebanEntry> {
        self.entries
            .read()
            .values()
            .filter(|e| kind.map_or(true, |k| e.kind == k))
            .cloned()
            .collect()
    }
}
