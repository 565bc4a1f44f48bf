//! Reserved names and namespace layout constants.

/// The root identity; passes every permission check.
pub const ROOT_NAME: &str = "root";

/// Sanction receiver meaning "anyone".
pub const EVERYONE: &str = "all";

/// The base domain, carrying the reserved `team` sub-area.
pub const BASE_DOMAIN: &str = "Base";

/// The holding domain for unaffiliated staff. May never self-grant, and
/// its ordinary members get no implicit write access.
pub const WIZARD_DOMAIN: &str = "Wiz";

/// Top-level segment of the domains area (`/d`).
pub const DOMAIN_AREA: &str = "d";

/// Top-level segment of the wizard-home area (`/w`).
pub const HOME_AREA: &str = "w";

/// Top-level segment of the system log area (`/syslog`).
pub const SYSLOG_AREA: &str = "syslog";

/// World-accessible sub-area inside domains and homes.
pub const OPEN_DIR: &str = "open";

/// Closed sub-area inside domains and homes.
pub const PRIVATE_DIR: &str = "private";

/// Team sub-area inside the base domain.
pub const TEAM_DIR: &str = "team";

/// Directory under `private` holding per-student restriction logs.
pub const RESTRICTLOG_DIR: &str = "restrictlog";

/// Restricted subdirectory of the system log area.
pub const LOG_DIR: &str = "log";

/// The oversight team with full access to `/syslog/log`.
pub const OVERSIGHT_TEAM: &str = "audit";

/// Log categories under `/syslog/log` that domain officers may access.
pub const OFFICER_LOG_CATEGORIES: &[&str] = &["domain", "enter", "death"];

/// Check a principal name: non-empty, lower-case ASCII alphanumerics.
pub fn valid_principal_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Check a domain name: leading upper-case ASCII letter, then letters.
pub fn valid_domain_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => chars.all(|c| c.is_ascii_alphabetic()),
        _ => false,
    }
}

/// Check a domain short code: exactly three lower-case ASCII letters.
pub fn valid_domain_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_lowercase())
}
