//! Identity, rank and organization stores for the Vigil authorization
//! engine.
//!
//! This crate owns the durable records the decision engine consults:
//!
//! - **Registry** - principals with their ranks, levels, restrictions and
//!   mentor links, and domains with their officers, members and counters.
//! - **Administration** - the audited mutation surface: promotions and
//!   demotions, domain lifecycle, officer appointments, applications,
//!   sanctions on behalf of others, sitebans.
//! - **SitebanGate** - wildcard address bans checked before login.
//! - **AuditLog** - append-only trails for administrative actions,
//!   siteban changes and refused snoop attempts.
//! - **Scheduler** - cooperative resumable background maintenance.

pub mod admin;
pub mod audit;
pub mod confirm;
pub mod domain;
pub mod maintenance;
pub mod principal;
pub mod registry;
pub mod siteban;

pub use admin::Administration;
pub use audit::{AuditEntry, AuditLog, ADMIN_STREAM, SITEBAN_STREAM, SNOOP_STREAM};
pub use confirm::Confirmations;
pub use domain::{Domain, DEFAULT_MAX_MEMBERS};
pub use maintenance::{ResumableTask, SanctionSweep, Scheduler, TaskStatus};
pub use principal::Principal;
pub use registry::Registry;
pub use siteban::{BanKind, SitebanEntry, SitebanGate};
