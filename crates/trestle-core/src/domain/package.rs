//! Package identity and per-dispatch package state.

use std::fmt;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::domain::{cache_key::CacheKey, error::DomainError, version::VersionRequest};

const MAX_NAME_LEN: usize = 214;

/// Registry-unique package identifier, e.g. `init` or `@scope/init`.
///
/// Invariant: non-empty, no whitespace, no backslash, `@` only as the
/// first character, and every `/`-separated segment is a plain name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageName(String);

impl PackageName {
    /// Names compiled into the tool; validity is asserted by tests.
    pub(crate) fn builtin(name: &'static str) -> Self {
        Self(name.to_string())
    }

    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let invalid = |reason: &str| DomainError::InvalidPackageName {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name cannot be empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(invalid("name is longer than 214 characters"));
        }
        if name.starts_with('.') || name.starts_with('_') {
            return Err(invalid("name cannot start with '.' or '_'"));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("name cannot contain whitespace"));
        }
        if name.contains('\\') {
            return Err(invalid("name cannot contain '\\'"));
        }
        if name.chars().skip(1).any(|c| c == '@') {
            return Err(invalid("'@' is only allowed as a scope prefix"));
        }
        let body = name.strip_prefix('@').unwrap_or(&name);
        if body
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(invalid("every '/'-separated segment must be a plain name"));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative path of the package inside an npm-style `node_modules`.
    pub fn as_relative_path(&self) -> PathBuf {
        self.0.split('/').collect()
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PackageName {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PackageName> for String {
    fn from(value: PackageName) -> Self {
        value.0
    }
}

/// Where a package lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageLocation {
    /// Version-multiplexed: `<store_dir>/<cache key>`.
    Cached {
        target_dir: PathBuf,
        store_dir: PathBuf,
    },
    /// A single fixed path with no version multiplexing.
    Direct { target_path: PathBuf },
}

/// One fetchable unit of code, alive for a single dispatch.
///
/// The resolved version is bound once, before any existence check, and
/// only ever moves forward afterwards (see [`Package::advance_to`]).
#[derive(Debug, Clone)]
pub struct Package {
    name: PackageName,
    requested: VersionRequest,
    resolved: Option<Version>,
    location: PackageLocation,
}

impl Package {
    pub fn cached(
        name: PackageName,
        requested: VersionRequest,
        target_dir: impl Into<PathBuf>,
        store_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name,
            requested,
            resolved: None,
            location: PackageLocation::Cached {
                target_dir: target_dir.into(),
                store_dir: store_dir.into(),
            },
        }
    }

    pub fn direct(
        name: PackageName,
        requested: VersionRequest,
        target_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name,
            requested,
            resolved: None,
            location: PackageLocation::Direct {
                target_path: target_path.into(),
            },
        }
    }

    pub fn name(&self) -> &PackageName {
        &self.name
    }

    pub fn requested(&self) -> &VersionRequest {
        &self.requested
    }

    pub fn resolved(&self) -> Option<&Version> {
        self.resolved.as_ref()
    }

    pub fn location(&self) -> &PackageLocation {
        &self.location
    }

    pub fn is_direct(&self) -> bool {
        matches!(self.location, PackageLocation::Direct { .. })
    }

    pub fn store_dir(&self) -> Option<&Path> {
        match &self.location {
            PackageLocation::Cached { store_dir, .. } => Some(store_dir),
            PackageLocation::Direct { .. } => None,
        }
    }

    /// Bind the resolved version unless one is already bound.
    ///
    /// Returns the version that is bound afterwards.
    pub fn bind_resolved(&mut self, version: Version) -> &Version {
        self.resolved.get_or_insert(version)
    }

    /// Rebind to a strictly newer version. Returns `false` (and changes
    /// nothing) for anything that would not move forward.
    pub fn advance_to(&mut self, version: Version) -> bool {
        match &self.resolved {
            Some(current) if version <= *current => false,
            _ => {
                self.resolved = Some(version);
                true
            }
        }
    }

    /// Cache key of the bound version; `None` in direct mode or before
    /// resolution.
    pub fn cache_key(&self) -> Option<CacheKey> {
        match (&self.location, &self.resolved) {
            (PackageLocation::Cached { .. }, Some(version)) => {
                Some(CacheKey::new(&self.name, version))
            }
            _ => None,
        }
    }

    /// Cache directory of an arbitrary version of this package.
    pub fn cache_path_for(&self, version: &Version) -> Option<PathBuf> {
        self.store_dir()
            .map(|store| store.join(CacheKey::new(&self.name, version).as_str()))
    }

    /// Directory the package contents live in, once known.
    pub fn root_dir(&self) -> Option<PathBuf> {
        match &self.location {
            PackageLocation::Direct { target_path } => Some(target_path.clone()),
            PackageLocation::Cached { .. } => {
                self.resolved.as_ref().and_then(|v| self.cache_path_for(v))
            }
        }
    }
}
