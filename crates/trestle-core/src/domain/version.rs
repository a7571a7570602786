//! Version requests and the pure resolver that turns them into versions.
//!
//! Everything here operates on an in-memory list of version strings as a
//! registry reported them. Strings that are not valid semantic versions are
//! skipped, never treated as errors: registries routinely carry junk tags.

use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Sentinel accepted wherever a version request is parsed.
pub const LATEST: &str = "latest";

/// What the invoker asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VersionRequest {
    /// The highest published version.
    #[default]
    Latest,
    /// Exactly this version.
    Exact(Version),
    /// The highest version matching a range expression.
    Range(VersionReq),
}

impl VersionRequest {
    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }
}

impl fmt::Display for VersionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str(LATEST),
            Self::Exact(v) => write!(f, "{v}"),
            Self::Range(r) => write!(f, "{r}"),
        }
    }
}

impl FromStr for VersionRequest {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case(LATEST) {
            return Ok(Self::Latest);
        }
        if let Some(v) = parse_version_loose(raw) {
            return Ok(Self::Exact(v));
        }
        VersionReq::parse(raw)
            .map(Self::Range)
            .map_err(|e| DomainError::InvalidVersionRequest {
                request: raw.to_string(),
                reason: e.to_string(),
            })
    }
}

impl TryFrom<String> for VersionRequest {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionRequest> for String {
    fn from(value: VersionRequest) -> Self {
        value.to_string()
    }
}

/// Parse a version, tolerating a leading `v` (`v1.2.3`).
pub fn parse_version_loose(raw: &str) -> Option<Version> {
    let t = raw.trim();
    let t = t.strip_prefix('v').unwrap_or(t);
    Version::parse(t).ok()
}

/// Pure version selection over a registry's version list.
pub struct VersionResolver;

impl VersionResolver {
    /// Resolve a request against the versions a registry reported.
    ///
    /// Returns `None` when the list is empty or nothing satisfies the
    /// request.
    pub fn resolve(request: &VersionRequest, versions: &[String]) -> Option<Version> {
        match request {
            VersionRequest::Latest => Self::latest(versions),
            VersionRequest::Exact(wanted) => parsed(versions).find(|v| v == wanted),
            VersionRequest::Range(req) => parsed(versions).filter(|v| req.matches(v)).max(),
        }
    }

    /// The highest version overall.
    ///
    /// Pre-releases only win when the registry has no stable release at all.
    pub fn latest(versions: &[String]) -> Option<Version> {
        let stable = parsed(versions).filter(|v| v.pre.is_empty()).max();
        stable.or_else(|| parsed(versions).max())
    }

    /// The highest version compatible with `base` (`^base`): at least
    /// `base`, never across a breaking boundary.
    pub fn compatible(base: &Version, versions: &[String]) -> Option<Version> {
        let req = caret(base);
        parsed(versions).filter(|v| req.matches(v)).max()
    }
}

fn parsed(versions: &[String]) -> impl Iterator<Item = Version> + '_ {
    versions.iter().filter_map(|s| parse_version_loose(s))
}

fn caret(base: &Version) -> VersionReq {
    VersionReq {
        comparators: vec![semver::Comparator {
            op: semver::Op::Caret,
            major: base.major,
            minor: Some(base.minor),
            patch: Some(base.patch),
            pre: base.pre.clone(),
        }],
    }
}
