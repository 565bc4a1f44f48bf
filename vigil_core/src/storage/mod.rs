//! Persistent storage abstraction.
//!
//! Every Vigil store persists synchronously through this trait at the end
//! of each mutating call: durable storage is written first, in-memory
//! caches second, so a storage failure aborts the single operation without
//! leaving caches diverged from disk.
//!
//! Keys are `/`-separated (`principal/alice`, `domain/Acme`, `sanctions`).
//! Streams are append-only line files used by the audit log.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde_json::Value;

use crate::error::{Result, StorageError};

/// Trait for the durable key-document store.
pub trait Storage: Send + Sync {
    /// Load the document stored under `key`, or `None` if absent.
    fn load(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous document.
    fn save(&self, key: &str, value: &Value) -> Result<()>;

    /// Remove the document under `key`. Removing an absent key is a no-op.
    fn remove(&self, key: &str) -> Result<()>;

    /// Rename the document under `from` to `to`, replacing any document
    /// already there. Errors if `from` is absent.
    fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// List the keys directly under `prefix`.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Append one line to the named append-only stream.
    fn append_line(&self, stream: &str, line: &str) -> Result<()>;
}

/// Validate a storage key: non-empty `/`-separated segments of ASCII
/// alphanumerics, `.`, `_` and `-`, with no relative components.
pub(crate) fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key.split('/').all(|seg| {
            !seg.is_empty()
                && seg != "."
                && seg != ".."
                && seg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        });
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation() {
        assert!(check_key("principal/alice").is_ok());
        assert!(check_key("domain/Acme.removed").is_ok());
        assert!(check_key("sanctions").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key("a//b").is_err());
        assert!(check_key("../escape").is_err());
        assert!(check_key("a/b c").is_err());
    }
}
