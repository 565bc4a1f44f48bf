//! In-memory storage for tests.
//!
//! Behaves like `FileStorage` over a map, counts every durable write so
//! tests can assert flush-on-mutate behavior, and can be told to fail so
//! tests can exercise the storage-failure path of each mutator.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;

use super::{check_key, Storage};
use crate::error::{Result, StorageError};

#[derive(Default)]
pub struct MemoryStorage {
    documents: RwLock<BTreeMap<String, Value>>,
    streams: RwLock<HashMap<String, Vec<String>>>,
    writes: AtomicU64,
    failing: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of durable writes (saves, removes, renames, appends) so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent mutating call fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The lines appended to `stream` so far.
    pub fn stream_lines(&self, stream: &str) -> Vec<String> {
        self.streams
            .read()
            .get(stream)
            .cloned()
            .unwrap_or_default()
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Io(std::io::Error::other("injected failure")).into())
        } else {
            Ok(())
        }
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        check_key(key)?;
        Ok(self.documents.read().get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        check_key(key)?;
        self.check_failing()?;
        self.documents.write().insert(key.to_string(), value.clone());
        self.count_write();
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.check_failing()?;
        self.documents.write().remove(key);
        self.count_write();
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        check_key(from)?;
        check_key(to)?;
        self.check_failing()?;
        let mut documents = self.documents.write();
        let value = documents
            .remove(from)
            .ok_or_else(|| StorageError::InvalidKey(format!("no document at {}", from)))?;
        documents.insert(to.to_string(), value);
        self.count_write();
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        check_key(prefix)?;
        let lead = format!("{}/", prefix);
        Ok(self
            .documents
            .read()
            .keys()
            .filter(|k| {
                k.starts_with(&lead) && !k[lead.len()..].contains('/')
            })
            .cloned()
            .collect())
    }

    fn append_line(&self, stream: &str, line: &str) -> Result<()> {
        check_key(stream)?;
        self.check_failing()?;
        self.streams
            .write()
            .entry(stream.to_string())
            .or_default()
            .push(line.to_string());
        self.count_write();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip() {
        let storage = MemoryStorage::new();
        storage.save("domain/Acme", &json!({"code": "acm"})).unwrap();
        assert_eq!(
            storage.load("domain/Acme").unwrap().unwrap()["code"],
            "acm"
        );
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn test_list_is_shallow() {
        let storage = MemoryStorage::new();
        storage.save("principal/alice", &json!({})).unwrap();
        storage.save("principal/logs/alice", &json!({})).unwrap();
        let keys = storage.list("principal").unwrap();
        assert_eq!(keys, vec!["principal/alice"]);
    }

    #[test]
    fn test_injected_failure() {
        let storage = MemoryStorage::new();
        storage.set_failing(true);
        assert!(storage.save("x", &json!({})).is_err());
        storage.set_failing(false);
        assert!(storage.save("x", &json!({})).is_ok());
    }

    #[test]
    fn test_streams() {
        let storage = MemoryStorage::new();
        storage.append_line("audit/admin", "entry").unwrap();
        assert_eq!(storage.stream_lines("audit/admin"), vec!["entry"]);
        assert!(storage.stream_lines("audit/other").is_empty());
    }
}
