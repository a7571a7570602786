//! Directory-backed registry.
//!
//! ```text
//! <root>/
//! └── @scope/
//!     └── init/
//!         ├── 1.0.0/        one directory per published version
//!         └── 1.2.0/
//!             ├── package.json
//!             └── index.js
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use semver::Version;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use trestle_core::{
    application::{ApplicationError, ports::PackageManager},
    domain::PackageName,
    error::TrestleResult,
};

#[derive(Debug, Clone)]
pub struct LocalRegistry {
    root: PathBuf,
}

impl LocalRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn package_dir(&self, name: &PackageName) -> PathBuf {
        self.root.join(name.as_relative_path())
    }
}

impl PackageManager for LocalRegistry {
    #[instrument(skip_all, fields(package = %name))]
    fn list_versions(&self, name: &PackageName) -> TrestleResult<Vec<String>> {
        let dir = self.package_dir(name);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Package not published");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ApplicationError::Filesystem {
                    path: dir,
                    reason: e.to_string(),
                }
                .into());
            }
        };

        let versions = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        Ok(versions)
    }

    #[instrument(skip_all, fields(package = %name, version = %version))]
    fn fetch(
        &self,
        name: &PackageName,
        version: &Version,
        destination: &Path,
    ) -> TrestleResult<()> {
        let install_error = |reason: String| ApplicationError::Install {
            package: name.to_string(),
            version: version.clone(),
            reason,
        };

        let source = self.package_dir(name).join(version.to_string());
        if !source.is_dir() {
            let reason = format!("{} is not published in {}", version, self.root.display());
            return Err(install_error(reason).into());
        }

        let mut copied = 0usize;
        let io_error =
            |path: &Path, e: std::io::Error| install_error(format!("{}: {e}", path.display()));
        for entry in WalkDir::new(&source).min_depth(1) {
            let entry = entry.map_err(|e| install_error(format!("directory walk error: {e}")))?;
            let relative = entry
                .path()
                .strip_prefix(&source)
                .map_err(|e| install_error(e.to_string()))?;
            let target = destination.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|e| io_error(&target, e))?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
                }
                fs::copy(entry.path(), &target).map_err(|e| io_error(&target, e))?;
                copied += 1;
            }
        }
        debug!(files = copied, "Copied package");
        Ok(())
    }
}
