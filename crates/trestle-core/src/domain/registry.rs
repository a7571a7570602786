//! Static command → package bindings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::{error::DomainError, package::PackageName, version::VersionRequest};

/// Command name the tool ships a binding for.
pub const INIT_COMMAND: &str = "init";
/// Package the builtin `init` command dispatches to.
pub const INIT_PACKAGE: &str = "@trestle/init";

/// Which package (and which versions of it) a command runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBinding {
    pub package: PackageName,
    pub version: VersionRequest,
}

impl CommandBinding {
    pub fn new(package: PackageName, version: VersionRequest) -> Self {
        Self { package, version }
    }
}

impl fmt::Display for CommandBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_latest() {
            write!(f, "{}", self.package)
        } else {
            write!(f, "{}@{}", self.package, self.version)
        }
    }
}

/// `package` or `package@request`; a leading `@` belongs to the scope.
impl FromStr for CommandBinding {
    type Err = DomainError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let spec = spec.trim();
        let (name, version) = match spec.rfind('@') {
            Some(idx) if idx > 0 => (&spec[..idx], &spec[idx + 1..]),
            _ => (spec, ""),
        };
        let wrap = |e: DomainError| DomainError::InvalidBinding {
            spec: spec.to_string(),
            reason: e.to_string(),
        };
        Ok(Self {
            package: PackageName::new(name).map_err(wrap)?,
            version: version.parse().map_err(wrap)?,
        })
    }
}

/// Known commands. Lookups never touch the network or the filesystem.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    bindings: BTreeMap<String, CommandBinding>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bindings the tool ships with.
    pub fn builtin() -> Self {
        let init = PackageName::builtin(INIT_PACKAGE);
        Self::new().with_binding(INIT_COMMAND, CommandBinding::new(init, VersionRequest::Latest))
    }

    pub fn with_binding(mut self, command: impl Into<String>, binding: CommandBinding) -> Self {
        self.bind(command, binding);
        self
    }

    /// Add or replace a binding.
    pub fn bind(&mut self, command: impl Into<String>, binding: CommandBinding) {
        self.bindings.insert(command.into(), binding);
    }

    pub fn get(&self, command: &str) -> Option<&CommandBinding> {
        self.bindings.get(command)
    }

    /// Command names in sorted order.
    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandBinding)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
