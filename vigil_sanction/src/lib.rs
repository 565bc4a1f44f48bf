//! # Vigil Sanction
//!
//! `vigil_sanction` is the delegation half of the Vigil authorization
//! engine: a persistent, hierarchical store of sanctions — delegated,
//! revocable grants of read/write/snoop rights from one principal or
//! domain to another, optionally scoped to a sub-path of the giver's
//! namespace.
//!
//! Key concepts:
//!
//! 1. **Existence is the grant**: a sanction tuple lives as a leaf in a
//!    tree rooted at the giver; there is no enable/disable flag.
//!
//! 2. **Subsumption**: a broader grant (an unscoped one, an ancestor
//!    prefix, the `-all` variant, or a grant to the receiver `all`)
//!    satisfies any narrower query.
//!
//! 3. **Bulk revocation**: when a giver or receiver ceases to exist, its
//!    whole subtree is deleted in one operation.

pub mod store;
pub mod tree;

// Re-export key types for convenience
pub use store::SanctionStore;
pub use tree::SanctionTree;
