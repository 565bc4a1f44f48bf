//! Virtual paths and area resolution.
//!
//! Every permission query names a virtual path inside the world's
//! filesystem-like namespace. `VPath` is the normalized form; `Area` is
//! the closed set of reserved top-level areas, resolved exactly once
//! before the decision engine dispatches on it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::names;

/// A normalized, rooted virtual path.
///
/// Parsing collapses duplicate separators and trailing slashes, and
/// rejects `.` and `..` components outright: the namespace is virtual, so
/// there is nothing relative to resolve against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub struct VPath {
    segments: Vec<String>,
}

impl VPath {
    /// The root path `/`.
    pub fn root() -> VPath {
        VPath { segments: Vec::new() }
    }

    /// Build a path from pre-split segments. Empty, `.` and `..` segments
    /// are rejected.
    pub fn from_segments<I, S>(segments: I) -> Result<VPath, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = Vec::new();
        for seg in segments {
            let seg = seg.into();
            if seg.is_empty() || seg == "." || seg == ".." {
                return Err(format!("invalid path segment: {:?}", seg));
            }
            out.push(seg);
        }
        Ok(VPath { segments: out })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Whether `self` is `prefix` or lies below it.
    pub fn starts_with(&self, prefix: &VPath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }
}

impl FromStr for VPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VPath::from_segments(s.split('/').filter(|seg| !seg.is_empty()))
    }
}

impl TryFrom<String> for VPath {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<VPath> for String {
    fn from(path: VPath) -> String {
        path.to_string()
    }
}

impl fmt::Display for VPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.segments {
            write!(f, "/{}", seg)?;
        }
        Ok(())
    }
}

/// The reserved top-level areas of the namespace.
///
/// Resolved once from a path's leading segments; the decision engine then
/// pattern-matches instead of re-testing string prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area<'a> {
    /// The root path `/` itself.
    Root,
    /// `/d/<Domain>/...` — the domains area.
    Domains { domain: &'a str, rest: &'a [String] },
    /// `/w/<wizard>/...` — the wizard-home area.
    Home { owner: &'a str, rest: &'a [String] },
    /// `/syslog/...` — the system log area.
    SysLog { rest: &'a [String] },
    /// Anything else.
    Other,
}

impl<'a> Area<'a> {
    pub fn resolve(path: &'a VPath) -> Area<'a> {
        let segs = path.segments();
        match segs.first().map(String::as_str) {
            None => Area::Root,
            Some(names::DOMAIN_AREA) => match segs.get(1) {
                Some(domain) => Area::Domains {
                    domain,
                    rest: &segs[2..],
                },
                // A bare "/d" has no domain to decide on.
                None => Area::Other,
            },
            Some(names::HOME_AREA) => match segs.get(1) {
                Some(owner) => Area::Home {
                    owner,
                    rest: &segs[2..],
                },
                None => Area::Other,
            },
            Some(names::SYSLOG_AREA) => Area::SysLog { rest: &segs[1..] },
            Some(_) => Area::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let p: VPath = "//d///Acme/domain/".parse().unwrap();
        assert_eq!(p.segments(), ["d", "Acme", "domain"]);
        assert_eq!(p.to_string(), "/d/Acme/domain");
    }

    #[test]
    fn test_parse_rejects_relative() {
        assert!("/d/../w/root".parse::<VPath>().is_err());
        assert!("/d/./x".parse::<VPath>().is_err());
    }

    #[test]
    fn test_root() {
        let p: VPath = "/".parse().unwrap();
        assert!(p.is_root());
        assert_eq!(p.to_string(), "/");
    }

    #[test]
    fn test_starts_with() {
        let base: VPath = "/d/Acme".parse().unwrap();
        let deep: VPath = "/d/Acme/domain/x".parse().unwrap();
        assert!(deep.starts_with(&base));
        assert!(!base.starts_with(&deep));
        assert!(deep.starts_with(&VPath::root()));
    }

    #[test]
    fn test_area_resolution() {
        let p: VPath = "/d/Acme/open/notes".parse().unwrap();
        match Area::resolve(&p) {
            Area::Domains { domain, rest } => {
                assert_eq!(domain, "Acme");
                assert_eq!(rest, ["open", "notes"]);
            }
            other => panic!("unexpected area: {:?}", other),
        }

        let p: VPath = "/w/alice/private/diary".parse().unwrap();
        assert!(matches!(Area::resolve(&p), Area::Home { owner: "alice", .. }));

        let p: VPath = "/syslog/log/domain".parse().unwrap();
        assert!(matches!(Area::resolve(&p), Area::SysLog { .. }));

        let p: VPath = "/doc/manual".parse().unwrap();
        assert!(matches!(Area::resolve(&p), Area::Other));

        assert!(matches!(Area::resolve(&VPath::root()), Area::Root));

        let p: VPath = "/d".parse().unwrap();
        assert!(matches!(Area::resolve(&p), Area::Other));
    }
}
