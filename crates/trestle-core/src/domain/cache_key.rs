//! Deterministic, reversible cache addressing.
//!
//! A [`CacheKey`] is the directory name a `(package name, version)` pair
//! occupies under the store directory. Both halves are escaped so the key:
//!
//! - never contains a path separator (scoped names like `@scope/init`),
//! - is entirely lower-case, so case-insensitive filesystems cannot fold
//!   two distinct keys together,
//! - contains exactly one `@`, which separates the two escaped halves.
//!
//! Escaping keeps `[a-z0-9.-]` and writes every other byte as `_` followed
//! by two lower-case hex digits. `_` itself is escaped, so decoding is
//! unambiguous and the mapping is injective.

use std::fmt;

use semver::Version;

use crate::domain::{error::DomainError, package::PackageName};

const SEPARATOR: char = '@';

/// Directory name of one cached `(name, version)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Pure function of `(name, version)`; never consults the filesystem.
    pub fn new(name: &PackageName, version: &Version) -> Self {
        Self(format!(
            "{}{SEPARATOR}{}",
            escape(name.as_str()),
            escape(&version.to_string())
        ))
    }

    /// Recover `(name, version)` from a directory name.
    pub fn decode(key: &str) -> Result<(PackageName, Version), DomainError> {
        let invalid = || DomainError::InvalidCacheKey {
            key: key.to_string(),
        };

        let (name, version) = key.split_once(SEPARATOR).ok_or_else(invalid)?;
        let name = unescape(name).ok_or_else(invalid)?;
        let version = unescape(version).ok_or_else(invalid)?;

        let name = PackageName::new(name).map_err(|_| invalid())?;
        let version = Version::parse(&version).map_err(|_| invalid())?;

        // Only keys this module could have produced are accepted.
        if Self::new(&name, &version).0 != key {
            return Err(invalid());
        }
        Ok((name, version))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' => out.push(byte as char),
            _ => out.push_str(&format!("_{byte:02x}")),
        }
    }
    out
}

fn unescape(escaped: &str) -> Option<String> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'_' {
            let hex = escaped.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
