//! The sanction tree.
//!
//! Grants are recorded as nodes in a hierarchical namespace: the giver is
//! the first level, the receiver the second, then optional scope path
//! segments, with the right kind as a leaf marker. Existence of the leaf
//! *is* the grant; "does X hold this right" is a handful of prefix
//! lookups, and bulk revocation is a subtree delete.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use vigil_core::SanctionKind;

/// One node of the tree: leaf markers at this point of the namespace plus
/// children keyed by the next segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    kinds: BTreeSet<SanctionKind>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    children: BTreeMap<String, Node>,
}

impl Node {
    fn is_empty(&self) -> bool {
        self.kinds.is_empty() && self.children.is_empty()
    }

    fn descend(&self, segments: &[&str]) -> Option<&Node> {
        let mut node = self;
        for seg in segments {
            node = node.children.get(*seg)?;
        }
        Some(node)
    }

    /// Remove `kind` at the end of `segments`, pruning emptied children
    /// on the way back up. Returns whether a marker was removed.
    fn remove_marker(&mut self, segments: &[&str], kind: SanctionKind) -> bool {
        match segments.split_first() {
            None => self.kinds.remove(&kind),
            Some((first, rest)) => match self.children.get_mut(*first) {
                Some(child) => {
                    let removed = child.remove_marker(rest, kind);
                    if removed && child.is_empty() {
                        self.children.remove(*first);
                    }
                    removed
                }
                None => false,
            },
        }
    }

    fn collect(&self, prefix: &mut Vec<String>, out: &mut Vec<(SanctionKind, String)>) {
        for kind in &self.kinds {
            let path = if prefix.is_empty() {
                String::new()
            } else {
                format!("/{}", prefix.join("/"))
            };
            out.push((*kind, path));
        }
        for (name, child) in &self.children {
            prefix.push(name.clone());
            child.collect(prefix, out);
            prefix.pop();
        }
    }
}

/// The whole grant forest, keyed by giver at the top level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionTree {
    givers: BTreeMap<String, Node>,
}

impl SanctionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.givers.is_empty()
    }

    /// Record a grant. Returns false if the identical tuple was already
    /// present (idempotent).
    pub fn insert(
        &mut self,
        giver: &str,
        receiver: &str,
        kind: SanctionKind,
        scope: &[String],
    ) -> bool {
        let mut node = self
            .givers
            .entry(giver.to_string())
            .or_default()
            .children
            .entry(receiver.to_string())
            .or_default();
        for seg in scope {
            node = node.children.entry(seg.clone()).or_default();
        }
        node.kinds.insert(kind)
    }

    /// Remove exactly one tuple, pruning emptied nodes upward. The giver's
    /// own node is removed when nothing remains under it.
    pub fn remove(
        &mut self,
        giver: &str,
        receiver: &str,
        kind: SanctionKind,
        scope: &[String],
    ) -> bool {
        let Some(giver_node) = self.givers.get_mut(giver) else {
            return false;
        };
        let mut segments: Vec<&str> = vec![receiver];
        segments.extend(scope.iter().map(String::as_str));
        let removed = giver_node.remove_marker(&segments, kind);
        if removed && giver_node.is_empty() {
            self.givers.remove(giver);
        }
        removed
    }

    /// Remove everything the giver ever granted.
    pub fn remove_giver(&mut self, giver: &str) -> bool {
        self.givers.remove(giver).is_some()
    }

    /// Remove every right `receiver` holds from `giver`.
    pub fn remove_receiver(&mut self, giver: &str, receiver: &str) -> bool {
        let Some(giver_node) = self.givers.get_mut(giver) else {
            return false;
        };
        let removed = giver_node.children.remove(receiver).is_some();
        if removed && giver_node.is_empty() {
            self.givers.remove(giver);
        }
        removed
    }

    /// Remove every tuple, under any giver, naming `receiver`. Returns the
    /// number of givers affected.
    pub fn remove_received(&mut self, receiver: &str) -> usize {
        let mut affected = 0;
        let emptied: Vec<String> = self
            .givers
            .iter_mut()
            .filter_map(|(giver, node)| {
                if node.children.remove(receiver).is_some() {
                    affected += 1;
                    if node.is_empty() {
                        return Some(giver.clone());
                    }
                }
                None
            })
            .collect();
        for giver in emptied {
            self.givers.remove(&giver);
        }
        affected
    }

    /// Check whether a grant is live: the exact tuple exists, or a broader
    /// one subsumes it. Broader means the `-all` variant of the kind, a
    /// grant to the special receiver `all`, or (for scoped kinds) any
    /// ancestor prefix of the scope path.
    pub fn exists(
        &self,
        giver: &str,
        receiver: &str,
        kind: SanctionKind,
        scope: &[String],
    ) -> bool {
        let Some(giver_node) = self.givers.get(giver) else {
            return false;
        };
        for rcv in [receiver, vigil_core::names::EVERYONE] {
            let Some(node) = giver_node.children.get(rcv) else {
                continue;
            };
            // The unrestricted variant lives at the receiver root only.
            if let Some(all) = kind.all_variant() {
                if node.kinds.contains(&all) {
                    return true;
                }
            }
            // Walk the scope path; a marker at any ancestor prefix
            // (including the unscoped receiver root) covers the query.
            let mut node = node;
            if node.kinds.contains(&kind) {
                return true;
            }
            for seg in scope {
                match node.children.get(seg) {
                    Some(child) => {
                        node = child;
                        if node.kinds.contains(&kind) {
                            return true;
                        }
                    }
                    None => break,
                }
            }
        }
        false
    }

    pub fn receivers(&self, giver: &str) -> Vec<String> {
        self.givers
            .get(giver)
            .map(|node| node.children.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Enumerate every (kind, scope path) the receiver holds from the
    /// giver. The scope path is `""` for unscoped grants.
    pub fn grants(&self, giver: &str, receiver: &str) -> Vec<(SanctionKind, String)> {
        let mut out = Vec::new();
        if let Some(node) = self
            .givers
            .get(giver)
            .and_then(|g| g.children.get(receiver))
        {
            node.collect(&mut Vec::new(), &mut out);
        }
        out
    }

    pub fn givers(&self) -> Vec<String> {
        self.givers.keys().cloned().collect()
    }

    /// Whether the tree contains any tuple naming `receiver`.
    pub fn names_receiver(&self, receiver: &str) -> bool {
        self.givers
            .values()
            .any(|node| node.children.contains_key(receiver))
    }

    /// Look up an exact scope node, for tests and display.
    pub fn node_exists(&self, giver: &str, receiver: &str, scope: &[&str]) -> bool {
        self.givers
            .get(giver)
            .and_then(|g| g.children.get(receiver))
            .and_then(|n| n.descend(scope))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(path: &str) -> Vec<String> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_insert_exists_remove_round_trip() {
        let mut tree = SanctionTree::new();
        assert!(tree.insert("Acme", "bob", SanctionKind::Write, &segs("open/shared")));
        assert!(tree.exists("Acme", "bob", SanctionKind::Write, &segs("open/shared")));
        assert!(tree.remove("Acme", "bob", SanctionKind::Write, &segs("open/shared")));
        assert!(!tree.exists("Acme", "bob", SanctionKind::Write, &segs("open/shared")));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut tree = SanctionTree::new();
        assert!(tree.insert("alice", "bob", SanctionKind::Read, &[]));
        assert!(!tree.insert("alice", "bob", SanctionKind::Read, &[]));
        assert_eq!(tree.grants("alice", "bob").len(), 1);
    }

    #[test]
    fn test_unscoped_covers_every_path() {
        let mut tree = SanctionTree::new();
        tree.insert("acme", "bob", SanctionKind::Write, &[]);
        assert!(tree.exists("acme", "bob", SanctionKind::Write, &segs("any/sub/path")));
        assert!(!tree.exists("acme", "bob", SanctionKind::Read, &[]));
    }

    #[test]
    fn test_ancestor_prefix_subsumes() {
        let mut tree = SanctionTree::new();
        tree.insert("Acme", "bob", SanctionKind::Read, &segs("open"));
        assert!(tree.exists("Acme", "bob", SanctionKind::Read, &segs("open/deep/file")));
        assert!(!tree.exists("Acme", "bob", SanctionKind::Read, &segs("private/file")));
    }

    #[test]
    fn test_all_variant_subsumes() {
        let mut tree = SanctionTree::new();
        tree.insert("alice", "bob", SanctionKind::ReadAll, &[]);
        assert!(tree.exists("alice", "bob", SanctionKind::Read, &segs("x/y")));
        assert!(!tree.exists("alice", "bob", SanctionKind::Write, &[]));
    }

    #[test]
    fn test_everyone_receiver() {
        let mut tree = SanctionTree::new();
        tree.insert("alice", "all", SanctionKind::Read, &[]);
        assert!(tree.exists("alice", "carol", SanctionKind::Read, &[]));
        assert!(tree.exists("alice", "dave", SanctionKind::Read, &segs("sub")));
    }

    #[test]
    fn test_remove_prunes_empty_ancestors() {
        let mut tree = SanctionTree::new();
        tree.insert("Acme", "bob", SanctionKind::Write, &segs("a/b/c"));
        tree.insert("Acme", "bob", SanctionKind::Read, &segs("a"));
        assert!(tree.remove("Acme", "bob", SanctionKind::Write, &segs("a/b/c")));

        // The b/c branch is gone, but a (still carrying a marker) stays.
        assert!(!tree.node_exists("Acme", "bob", &["a", "b"]));
        assert!(tree.exists("Acme", "bob", SanctionKind::Read, &segs("a/x")));
    }

    #[test]
    fn test_remove_receiver_subtree() {
        let mut tree = SanctionTree::new();
        tree.insert("Acme", "bob", SanctionKind::Write, &[]);
        tree.insert("Acme", "bob", SanctionKind::Read, &segs("open"));
        tree.insert("Acme", "carol", SanctionKind::Read, &[]);

        assert!(tree.remove_receiver("Acme", "bob"));
        assert!(tree.grants("Acme", "bob").is_empty());
        assert_eq!(tree.receivers("Acme"), vec!["carol"]);
    }

    #[test]
    fn test_remove_received_across_givers() {
        let mut tree = SanctionTree::new();
        tree.insert("Acme", "bob", SanctionKind::Write, &[]);
        tree.insert("alice", "bob", SanctionKind::Snoop, &[]);
        tree.insert("alice", "carol", SanctionKind::Read, &[]);

        assert_eq!(tree.remove_received("bob"), 2);
        assert!(!tree.names_receiver("bob"));
        // Acme had nothing left; alice keeps carol's grant.
        assert_eq!(tree.givers(), vec!["alice"]);
        assert_eq!(tree.grants("alice", "carol").len(), 1);
    }

    #[test]
    fn test_enumeration() {
        let mut tree = SanctionTree::new();
        tree.insert("Acme", "bob", SanctionKind::Write, &[]);
        tree.insert("Acme", "bob", SanctionKind::Read, &segs("open/docs"));

        let mut grants = tree.grants("Acme", "bob");
        grants.sort();
        assert_eq!(
            grants,
            vec![
                (SanctionKind::Read, "/open/docs".to_string()),
                (SanctionKind::Write, String::new()),
            ]
        );
    }

    #[test]
    fn test_serde_round_trip() {
        let mut tree = SanctionTree::new();
        tree.insert("Acme", "bob", SanctionKind::Write, &segs("open"));
        tree.insert("alice", "all", SanctionKind::ReadAll, &[]);

        let json = serde_json::to_value(&tree).unwrap();
        let back: SanctionTree = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }
}
