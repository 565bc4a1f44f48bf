//! Access and sanction kinds.
//!
//! `AccessKind` is what a caller asks the decision engine for.
//! `SanctionKind` is what a delegated grant records; the `-all` variants
//! are unrestricted forms of read and write that never take a scope path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The operation a caller is requesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Read,
    Write,
    /// Metadata-only query (file size, existence). Always permitted.
    Stat,
    Snoop,
}

/// The right recorded by a sanction tuple.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SanctionKind {
    Read,
    Write,
    Snoop,
    ReadAll,
    WriteAll,
}

impl SanctionKind {
    /// The unrestricted variant of this kind, if one exists.
    pub fn all_variant(self) -> Option<SanctionKind> {
        match self {
            SanctionKind::Read => Some(SanctionKind::ReadAll),
            SanctionKind::Write => Some(SanctionKind::WriteAll),
            _ => None,
        }
    }

    /// Whether this kind may carry a scope path. The `-all` variants are
    /// unrestricted by definition; snoop rights have no path to scope.
    pub fn scopable(self) -> bool {
        matches!(self, SanctionKind::Read | SanctionKind::Write)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SanctionKind::Read => "read",
            SanctionKind::Write => "write",
            SanctionKind::Snoop => "snoop",
            SanctionKind::ReadAll => "read-all",
            SanctionKind::WriteAll => "write-all",
        }
    }
}

impl fmt::Display for SanctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SanctionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(SanctionKind::Read),
            "write" => Ok(SanctionKind::Write),
            "snoop" => Ok(SanctionKind::Snoop),
            "read-all" => Ok(SanctionKind::ReadAll),
            "write-all" => Ok(SanctionKind::WriteAll),
            _ => Err(format!("unknown sanction kind: {}", s)),
        }
    }
}
