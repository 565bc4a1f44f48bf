//! Error types for the Vigil authorization engine.
//!
//! This module defines the error hierarchy shared by every Vigil crate.
//! Denials and lookups of absent records are *not* errors: permission
//! checks return `false` and accessors return `None`/empty. Errors are
//! reserved for precondition violations, refused administrative mutations
//! and genuine storage failures.

use thiserror::Error;

use crate::rank::Rank;

/// Root error type for the Vigil system.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Sanction error: {0}")]
    Sanction(#[from] SanctionError),

    #[error("Siteban error: {0}")]
    Ban(#[from] BanError),

    #[error("Administration error: {0}")]
    Admin(#[from] AdminError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors related to the identity and rank store.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown principal: {0}")]
    UnknownPrincipal(String),

    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("Principal already exists: {0}")]
    PrincipalExists(String),

    #[error("Domain already exists: {0}")]
    DomainExists(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid rank transition: {from} -> {to}")]
    InvalidTransition { from: Rank, to: Rank },

    #[error("Domain {domain} is full ({cap} members)")]
    DomainFull { domain: String, cap: usize },

    #[error("{name} is not a member of {domain}")]
    NotAMember { name: String, domain: String },

    #[error("{0} cannot leave the wizard holding domain without a rank change")]
    WizardDomainLocked(String),

    #[error("{0} cannot be both a mentor and a student")]
    MentorStudentConflict(String),

    #[error("{0} has no domain affiliation")]
    NoAffiliation(String),

    #[error("{name} already belongs to {domain}")]
    AlreadyAffiliated { name: String, domain: String },
}

/// Errors related to the sanction store.
#[derive(Debug, Error)]
pub enum SanctionError {
    #[error("Kind {0} does not take a scope path")]
    ScopedAllGrant(String),

    #[error("Invalid sanction kind: {0}")]
    InvalidKind(String),

    #[error("Invalid scope path: {0}")]
    InvalidScope(String),
}

/// Errors related to the siteban gate.
#[derive(Debug, Error)]
pub enum BanError {
    #[error("A ban already exists for pattern {0}")]
    DuplicatePattern(String),

    #[error("No ban exists for pattern {0}")]
    UnknownPattern(String),

    #[error("Invalid address pattern: {0}")]
    InvalidPattern(String),
}

/// Errors related to administrative operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{actor} has no standing to {action}")]
    NotAuthorized { actor: String, action: String },

    #[error("Domain {0} is reserved and cannot be removed")]
    ReservedDomain(String),

    #[error("{name} has no pending application to {domain}")]
    NoApplication { name: String, domain: String },

    #[error("Confirmation expired or missing for {0}")]
    ConfirmationMissing(String),
}

/// Errors related to persistent storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Result type used throughout the Vigil system.
pub type Result<T> = std::result::Result<T, Error>;
