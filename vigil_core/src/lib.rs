//! # Vigil Core
//!
//! `vigil_core` provides the shared vocabulary of the Vigil authorization
//! engine: the rank hierarchy, restriction flags, access and sanction
//! kinds, virtual paths with reserved-area resolution, the error
//! taxonomy, and the synchronous storage abstraction every store
//! persists through.
//!
//! Key concepts:
//!
//! 1. **Rank**: a total order of privilege from mortal to keeper, with a
//!    separate transition graph constraining rank changes.
//!
//! 2. **Sanction kind**: the right recorded by a delegated grant; the
//!    `-all` variants are unrestricted forms that take no scope path.
//!
//! 3. **Area**: the closed set of reserved top-level namespace areas,
//!    resolved once before the decision engine dispatches.
//!
//! 4. **Storage**: flush-on-mutate persistence; durable state is written
//!    before in-memory caches are touched.

pub mod error;
pub mod kind;
pub mod names;
pub mod path;
pub mod rank;
pub mod restriction;
pub mod storage;

// Re-export key types for convenience
pub use error::{AdminError, BanError, Error, RegistryError, Result, SanctionError, StorageError};
pub use kind::{AccessKind, SanctionKind};
pub use path::{Area, VPath};
pub use rank::Rank;
pub use restriction::Restriction;
pub use storage::{FileStorage, MemoryStorage, Storage};
