//! Entry point lookup inside an installed package.
//!
//! Manifest search order:
//!
//! | Order | Candidate                                  | Covers                  |
//! |-------|--------------------------------------------|-------------------------|
//! | 1     | `<root>/package.json`                      | registry copies, direct |
//! | 2     | `<root>/node_modules/<name>/package.json`  | npm `--prefix` installs |
//! | 3     | `package.json` in each ancestor of `root`  | direct mode subdirs     |
//!
//! A missing manifest or a manifest without `"main"` yields `None`; only the
//! caller knows whether that is fatal.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::{
    application::{ApplicationError, ports::Filesystem},
    domain::PackageName,
    error::TrestleResult,
};

pub const MANIFEST_FILE: &str = "package.json";
const MODULES_DIR: &str = "node_modules";
const ENTRY_FIELD: &str = "main";

pub struct EntryResolver {
    filesystem: Arc<dyn Filesystem>,
}

impl EntryResolver {
    pub fn new(filesystem: Arc<dyn Filesystem>) -> Self {
        Self { filesystem }
    }

    /// Absolute, normalized path of the declared entry file, if any.
    ///
    /// Malformed manifests are an error; a manifest that simply declares
    /// nothing is not.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn resolve(
        &self,
        root: &Path,
        package: Option<&PackageName>,
    ) -> TrestleResult<Option<PathBuf>> {
        let Some(manifest) = self.find_manifest(root, package) else {
            debug!("No manifest found");
            return Ok(None);
        };

        let text = self.filesystem.read_to_string(&manifest)?;
        let parsed: Value =
            serde_json::from_str(&text).map_err(|e| ApplicationError::ManifestInvalid {
                path: manifest.clone(),
                reason: e.to_string(),
            })?;

        let Some(main) = parsed
            .get(ENTRY_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
        else {
            debug!(manifest = %manifest.display(), "Manifest declares no entry");
            return Ok(None);
        };

        let base = manifest.parent().unwrap_or(root);
        let entry = normalize(&base.join(main));
        debug!(entry = %entry.display(), "Entry resolved");
        Ok(Some(entry))
    }

    fn find_manifest(&self, root: &Path, package: Option<&PackageName>) -> Option<PathBuf> {
        let nested = package.map(|name| {
            root.join(MODULES_DIR)
                .join(name.as_relative_path())
                .join(MANIFEST_FILE)
        });

        std::iter::once(root.join(MANIFEST_FILE))
            .chain(nested)
            .chain(root.ancestors().skip(1).map(|dir| dir.join(MANIFEST_FILE)))
            .find(|candidate| self.filesystem.exists(candidate))
    }
}

/// Collapse `.` and `..` lexically and use `/` as the separator everywhere.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if cfg!(windows) {
        PathBuf::from(out.to_string_lossy().replace('\\', "/"))
    } else {
        out
    }
}
