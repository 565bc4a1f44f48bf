//! The persistent sanction store.
//!
//! Wraps the grant tree with flush-on-mutate persistence and the query
//! surface the decision engine and administration use. Every mutator
//! persists the whole tree before the in-memory copy is replaced, so a
//! storage failure leaves the live state untouched.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use vigil_core::error::{Result, SanctionError};
use vigil_core::storage::Storage;
use vigil_core::{SanctionKind, VPath};

use crate::tree::SanctionTree;

/// Storage key of the persisted tree.
const SANCTIONS_KEY: &str = "sanctions";

pub struct SanctionStore {
    storage: Arc<dyn Storage>,
    tree: RwLock<SanctionTree>,
}

impl SanctionStore {
    /// Open the store, loading any persisted tree.
    pub fn open(storage: Arc<dyn Storage>) -> Result<Self> {
        let tree = match storage.load(SANCTIONS_KEY)? {
            Some(value) => {
                serde_json::from_value(value).map_err(vigil_core::StorageError::Serde)?
            }
            None => SanctionTree::new(),
        };
        Ok(Self {
            storage,
            tree: RwLock::new(tree),
        })
    }

    fn commit(&self, tree: SanctionTree) -> Result<()> {
        let value = serde_json::to_value(&tree).map_err(vigil_core::StorageError::Serde)?;
        self.storage.save(SANCTIONS_KEY, &value)?;
        *self.tree.write() = tree;
        Ok(())
    }

    fn check_scope(kind: SanctionKind, scope: &VPath) -> Result<()> {
        if !scope.is_root() && !kind.scopable() {
            return Err(SanctionError::ScopedAllGrant(kind.to_string()).into());
        }
        Ok(())
    }

    /// Record a grant. Idempotent: re-granting an existing tuple succeeds
    /// without rewriting storage.
    pub fn grant(
        &self,
        giver: &str,
        receiver: &str,
        kind: SanctionKind,
        scope: &VPath,
    ) -> Result<()> {
        Self::check_scope(kind, scope)?;
        let mut tree = self.tree.read().clone();
        if !tree.insert(giver, receiver, kind, scope.segments()) {
            debug!(giver, receiver, %kind, "grant already present");
            return Ok(());
        }
        self.commit(tree)?;
        info!(giver, receiver, %kind, scope = %scope, "sanction granted");
        Ok(())
    }

    /// Remove exactly one tuple. Revoking an absent tuple is a no-op.
    pub fn revoke(
        &self,
        giver: &str,
        receiver: &str,
        kind: SanctionKind,
        scope: &VPath,
    ) -> Result<()> {
        Self::check_scope(kind, scope)?;
        let mut tree = self.tree.read().clone();
        if !tree.remove(giver, receiver, kind, scope.segments()) {
            return Ok(());
        }
        self.commit(tree)?;
        info!(giver, receiver, %kind, scope = %scope, "sanction revoked");
        Ok(())
    }

    /// Remove every right `receiver` holds from `giver`.
    pub fn revoke_receiver(&self, giver: &str, receiver: &str) -> Result<()> {
        let mut tree = self.tree.read().clone();
        if !tree.remove_receiver(giver, receiver) {
            return Ok(());
        }
        self.commit(tree)?;
        info!(giver, receiver, "all sanctions to receiver revoked");
        Ok(())
    }

    /// Remove everything the giver ever granted (cascading subtree delete).
    pub fn revoke_all(&self, giver: &str) -> Result<()> {
        let mut tree = self.tree.read().clone();
        if !tree.remove_giver(giver) {
            return Ok(());
        }
        self.commit(tree)?;
        info!(giver, "giver subtree revoked");
        Ok(())
    }

    /// Remove every tuple, under any giver, naming `receiver`. Used when a
    /// principal or domain ceases to exist.
    pub fn revoke_received(&self, receiver: &str) -> Result<()> {
        let mut tree = self.tree.read().clone();
        if tree.remove_received(receiver) == 0 {
            return Ok(());
        }
        self.commit(tree)?;
        info!(receiver, "received sanctions revoked");
        Ok(())
    }

    /// Whether a live grant covers the tuple (exact or subsumed, §exists
    /// semantics of the tree).
    pub fn exists(&self, giver: &str, receiver: &str, kind: SanctionKind, scope: &VPath) -> bool {
        self.tree
            .read()
            .exists(giver, receiver, kind, scope.segments())
    }

    /// Unscoped convenience form of [`exists`](Self::exists).
    pub fn exists_unscoped(&self, giver: &str, receiver: &str, kind: SanctionKind) -> bool {
        self.exists(giver, receiver, kind, &VPath::root())
    }

    pub fn list_receivers(&self, giver: &str) -> Vec<String> {
        self.tree.read().receivers(giver)
    }

    pub fn list_grants(&self, giver: &str, receiver: &str) -> Vec<(SanctionKind, String)> {
        self.tree.read().grants(giver, receiver)
    }

    pub fn givers(&self) -> Vec<String> {
        self.tree.read().givers()
    }

    pub fn names_receiver(&self, receiver: &str) -> bool {
        self.tree.read().names_receiver(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::MemoryStorage;

    fn store() -> (Arc<MemoryStorage>, SanctionStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = SanctionStore::open(storage.clone() as Arc<dyn Storage>).unwrap();
        (storage, store)
    }

    fn vpath(s: &str) -> VPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_grant_exists_revoke() {
        let (_, store) = store();
        store
            .grant("Acme", "bob", SanctionKind::Write, &vpath("/open"))
            .unwrap();
        assert!(store.exists("Acme", "bob", SanctionKind::Write, &vpath("/open/x")));
        store
            .revoke("Acme", "bob", SanctionKind::Write, &vpath("/open"))
            .unwrap();
        assert!(!store.exists("Acme", "bob", SanctionKind::Write, &vpath("/open/x")));
    }

    #[test]
    fn test_scoped_all_grant_rejected() {
        let (_, store) = store();
        let err = store
            .grant("alice", "bob", SanctionKind::ReadAll, &vpath("/sub"))
            .unwrap_err();
        assert!(matches!(
            err,
            vigil_core::Error::Sanction(SanctionError::ScopedAllGrant(_))
        ));
        // Snoop names a person, not a path, so it takes no scope either.
        assert!(store
            .grant("alice", "bob", SanctionKind::Snoop, &vpath("/sub"))
            .is_err());
        assert!(store.list_grants("alice", "bob").is_empty());
    }

    #[test]
    fn test_idempotent_grant_skips_rewrite() {
        let (storage, store) = store();
        store
            .grant("alice", "bob", SanctionKind::Read, &VPath::root())
            .unwrap();
        let writes = storage.write_count();
        store
            .grant("alice", "bob", SanctionKind::Read, &VPath::root())
            .unwrap();
        assert_eq!(storage.write_count(), writes);
        assert_eq!(store.list_grants("alice", "bob").len(), 1);
    }

    #[test]
    fn test_mutations_flush_to_storage() {
        let (storage, store) = store();
        store
            .grant("alice", "bob", SanctionKind::Snoop, &VPath::root())
            .unwrap();

        // A fresh store over the same storage sees the grant.
        let reopened = SanctionStore::open(storage as Arc<dyn Storage>).unwrap();
        assert!(reopened.exists_unscoped("alice", "bob", SanctionKind::Snoop));
    }

    #[test]
    fn test_storage_failure_leaves_state_untouched() {
        let (storage, store) = store();
        store
            .grant("alice", "bob", SanctionKind::Read, &VPath::root())
            .unwrap();

        storage.set_failing(true);
        assert!(store
            .grant("alice", "carol", SanctionKind::Read, &VPath::root())
            .is_err());
        assert!(store.revoke_all("alice").is_err());
        storage.set_failing(false);

        // Only the successful grant is visible.
        assert!(store.exists_unscoped("alice", "bob", SanctionKind::Read));
        assert!(!store.exists_unscoped("alice", "carol", SanctionKind::Read));
    }

    #[test]
    fn test_bulk_revocation() {
        let (_, store) = store();
        store
            .grant("Acme", "bob", SanctionKind::Write, &VPath::root())
            .unwrap();
        store
            .grant("Acme", "carol", SanctionKind::Read, &vpath("/open"))
            .unwrap();
        store
            .grant("bob", "Acme", SanctionKind::Read, &VPath::root())
            .unwrap();

        store.revoke_all("Acme").unwrap();
        store.revoke_received("Acme").unwrap();

        assert!(store.list_receivers("Acme").is_empty());
        assert!(!store.names_receiver("Acme"));
        assert!(store.list_grants("bob", "Acme").is_empty());
    }
}
