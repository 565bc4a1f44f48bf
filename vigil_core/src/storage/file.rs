//! File-backed storage.
//!
//! One JSON document per key under a base directory. Documents are
//! written to a temporary file in the same directory and renamed into
//! place after `sync_all`, so a crash mid-write never leaves a partial
//! document where a complete one used to be.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use super::{check_key, Storage};
use crate::error::{Result, StorageError};

pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a file store rooted at `base_path`.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(StorageError::Io)?;
        debug!(path = %base_path.display(), "opened file storage");
        Ok(Self { base_path })
    }

    fn document_path(&self, key: &str) -> Result<PathBuf> {
        check_key(key)?;
        Ok(self.base_path.join(format!("{}.json", key)))
    }

    fn stream_path(&self, stream: &str) -> Result<PathBuf> {
        check_key(stream)?;
        Ok(self.base_path.join(format!("{}.log", stream)))
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidKey(path.display().to_string()))?;
        fs::create_dir_all(parent).map_err(StorageError::Io)?;

        let tmp = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp).map_err(StorageError::Io)?;
            file.write_all(contents.as_bytes()).map_err(StorageError::Io)?;
            file.sync_all().map_err(StorageError::Io)?;
        }
        fs::rename(&tmp, path).map_err(StorageError::Io)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.document_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).map_err(StorageError::Io)?;
        let value = serde_json::from_str(&contents).map_err(StorageError::Serde)?;
        Ok(Some(value))
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.document_path(key)?;
        let contents = serde_json::to_string_pretty(value).map_err(StorageError::Serde)?;
        self.write_atomic(&path, &contents)?;
        debug!(key, "saved document");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.document_path(key)?;
        if path.exists() {
            fs::remove_file(&path).map_err(StorageError::Io)?;
            debug!(key, "removed document");
        }
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.document_path(from)?;
        let to_path = self.document_path(to)?;
        if !from_path.exists() {
            return Err(StorageError::InvalidKey(format!("no document at {}", from)).into());
        }
        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
        fs::rename(&from_path, &to_path).map_err(StorageError::Io)?;
        debug!(from, to, "renamed document");
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        check_key(prefix)?;
        let dir = self.base_path.join(prefix);
        let mut keys = Vec::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(StorageError::Io(e).into()),
        };
        for entry in entries {
            let entry = entry.map_err(StorageError::Io)?;
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(format!("{}/{}", prefix, stem));
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn append_line(&self, stream: &str, line: &str) -> Result<()> {
        let path = self.stream_path(stream)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(StorageError::Io)?;
        writeln!(file, "{}", line).map_err(StorageError::Io)?;
        file.sync_all().map_err(StorageError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let doc = json!({"name": "alice", "rank": "normal"});
        storage.save("principal/alice", &doc).unwrap();

        let loaded = storage.load("principal/alice").unwrap().unwrap();
        assert_eq!(loaded, doc);
        assert!(storage.load("principal/bob").unwrap().is_none());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        storage.save("sanctions", &json!({})).unwrap();
        storage.remove("sanctions").unwrap();
        storage.remove("sanctions").unwrap();
        assert!(storage.load("sanctions").unwrap().is_none());
    }

    #[test]
    fn test_rename_keeps_contents() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let doc = json!({"name": "mallory"});
        storage.save("principal/mallory", &doc).unwrap();
        storage
            .rename("principal/mallory", "principal/mallory.removed")
            .unwrap();

        assert!(storage.load("principal/mallory").unwrap().is_none());
        let kept = storage.load("principal/mallory.removed").unwrap().unwrap();
        assert_eq!(kept, doc);
    }

    #[test]
    fn test_rename_missing_fails() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        assert!(storage.rename("principal/ghost", "principal/gone").is_err());
    }

    #[test]
    fn test_list_prefix() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        storage.save("principal/alice", &json!({})).unwrap();
        storage.save("principal/bob", &json!({})).unwrap();
        storage.save("domain/Acme", &json!({})).unwrap();

        let keys = storage.list("principal").unwrap();
        assert_eq!(keys, vec!["principal/alice", "principal/bob"]);
        assert_eq!(storage.list("nothing").unwrap().len(), 0);
    }

    #[test]
    fn test_append_lines() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        storage.append_line("audit/admin", "one").unwrap();
        storage.append_line("audit/admin", "two").unwrap();

        let contents =
            std::fs::read_to_string(dir.path().join("audit/admin.log")).unwrap();
        assert_eq!(contents, "one\ntwo\n");
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        assert!(storage.save("../outside", &json!({})).is_err());
    }
}
