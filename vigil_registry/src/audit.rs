//! Append-only audit trails.
//!
//! Administrative actions, siteban changes and refused snoop attempts are
//! appended to named streams. Each line is a self-contained JSON record;
//! the stream is the durable history and a bounded in-memory tail serves
//! recent-entry queries without re-reading storage.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use vigil_core::error::{Result, StorageError};
use vigil_core::storage::Storage;

/// Administrative mutations (rank changes, domain lifecycle, sanctions).
pub const ADMIN_STREAM: &str = "admin";
/// Siteban additions and removals.
pub const SITEBAN_STREAM: &str = "siteban";
/// Refused snoop attempts.
pub const SNOOP_STREAM: &str = "snoop";

const DEFAULT_MAX_TAIL: usize = 256;

/// Document holding the per-stream sequence counters.
const SEQS_KEY: &str = "audit/seqs";

/// One audited event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Per-stream sequence number, starting at 1.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    /// The principal who performed the action.
    pub actor: String,
    pub message: String,
}

pub struct AuditLog {
    storage: Arc<dyn Storage>,
    tails: DashMap<String, VecDeque<AuditEntry>>,
    seqs: Mutex<BTreeMap<String, u64>>,
    max_tail: usize,
}

impl AuditLog {
    /// Open the log, recovering the per-stream sequence counters so
    /// numbering continues across restarts.
    pub fn open(storage: Arc<dyn Storage>) -> Result<Self> {
        let seqs: BTreeMap<String, u64> = match storage.load(SEQS_KEY)? {
            Some(value) => serde_json::from_value(value).map_err(StorageError::Serde)?,
            None => BTreeMap::new(),
        };
        Ok(Self {
            storage,
            tails: DashMap::new(),
            seqs: Mutex::new(seqs),
            max_tail: DEFAULT_MAX_TAIL,
        })
    }

    /// Append an entry to `stream`. The sequence number is reserved
    /// durably before the line is written, so a failure in between leaves
    /// a gap in the stream, never a duplicate number.
    pub fn append(&self, stream: &str, actor: &str, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        let mut seqs = self.seqs.lock();
        let seq = seqs.get(stream).copied().unwrap_or(0) + 1;

        let mut reserved = seqs.clone();
        reserved.insert(stream.to_string(), seq);
        let value = serde_json::to_value(&reserved).map_err(StorageError::Serde)?;
        self.storage.save(SEQS_KEY, &value)?;

        let entry = AuditEntry {
            seq,
            timestamp: Utc::now(),
            actor: actor.to_string(),
            message,
        };
        let line = serde_json::to_string(&entry).map_err(StorageError::Serde)?;
        self.storage.append_line(&format!("audit/{}", stream), &line)?;

        *seqs = reserved;
        drop(seqs);
        let mut tail = self.tails.entry(stream.to_string()).or_default();
        tail.push_back(entry);
        while tail.len() > self.max_tail {
            tail.pop_front();
        }

        info!(stream, actor, seq, "audit entry recorded");
        Ok(())
    }

    /// The most recent `count` entries of `stream`, oldest first.
    pub fn recent(&self, stream: &str, count: usize) -> Vec<AuditEntry> {
        self.tails
            .get(stream)
            .map(|tail| {
                let skip = tail.len().saturating_sub(count);
                tail.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }
}
