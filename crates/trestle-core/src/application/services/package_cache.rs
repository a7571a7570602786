//! Package cache - existence, install and update decisions.
//!
//! Cache layout is `<store_dir>/<cache key>`. Installs are staged next to
//! their final location and renamed into place once the fetch succeeded,
//! under a per-key advisory lock:
//!
//! ```text
//! <store_dir>/
//! ├── .<key>.lock                 held while installing <key>
//! ├── .staging-<key>-<pid>/       fetch target, removed on failure
//! └── <key>/                      complete copies only
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;
use tracing::{debug, info, instrument, warn};

use crate::{
    application::{
        ApplicationError,
        ports::{Filesystem, PackageManager},
    },
    domain::{CacheKey, Package, PackageLocation, PackageName, VersionRequest, VersionResolver},
    error::TrestleResult,
};

const STAGING_PREFIX: &str = ".staging-";
const LOCK_SUFFIX: &str = ".lock";

/// One complete package copy found in a store directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CachedEntry {
    pub name: PackageName,
    pub version: Version,
    pub path: PathBuf,
}

/// Owns on-disk addressing plus the existence and freshness decisions.
pub struct PackageCache {
    filesystem: Arc<dyn Filesystem>,
    manager: Arc<dyn PackageManager>,
}

impl PackageCache {
    pub fn new(filesystem: Arc<dyn Filesystem>, manager: Arc<dyn PackageManager>) -> Self {
        Self { filesystem, manager }
    }

    /// Bind the package's resolved version, once.
    ///
    /// Creates the store directory if it is absent. Exact requests are
    /// bound without asking the registry; everything else is resolved
    /// against the registry's current version list. Direct-mode packages
    /// are left untouched.
    #[instrument(skip_all, fields(package = %pkg.name(), requested = %pkg.requested()))]
    pub fn prepare(&self, pkg: &mut Package) -> TrestleResult<()> {
        let Some(store_dir) = pkg.store_dir() else {
            return Ok(());
        };
        if pkg.resolved().is_some() {
            return Ok(());
        }
        if !self.filesystem.exists(store_dir) {
            self.filesystem.create_dir_all(store_dir)?;
        }

        let version = match pkg.requested() {
            VersionRequest::Exact(version) => version.clone(),
            request => self.resolve(pkg.name(), request)?,
        };
        debug!(version = %version, "Resolved version");
        pkg.bind_resolved(version);
        Ok(())
    }

    /// Whether a usable local copy exists.
    ///
    /// Direct mode checks the target path and computes no cache key.
    pub fn exists(&self, pkg: &mut Package) -> TrestleResult<bool> {
        if let PackageLocation::Direct { target_path } = pkg.location() {
            return Ok(self.filesystem.exists(target_path));
        }
        self.prepare(pkg)?;
        Ok(pkg
            .root_dir()
            .is_some_and(|root| self.filesystem.exists(&root)))
    }

    /// Materialize the resolved version into the store.
    ///
    /// A no-op when the cache entry is already present. Direct-mode
    /// packages are never installed: a missing target is reported instead.
    #[instrument(skip_all, fields(package = %pkg.name()))]
    pub fn install(&self, pkg: &mut Package) -> TrestleResult<()> {
        if let PackageLocation::Direct { target_path } = pkg.location() {
            if self.filesystem.exists(target_path) {
                return Ok(());
            }
            return Err(ApplicationError::TargetMissing {
                path: target_path.clone(),
            }
            .into());
        }

        self.prepare(pkg)?;
        let (Some(store_dir), Some(version)) = (pkg.store_dir(), pkg.resolved()) else {
            return Ok(());
        };
        self.install_version(pkg.name(), version, store_dir)?;
        Ok(())
    }

    /// Move the package to the newest version its own request allows.
    ///
    /// Fetches only when that version is not cached yet. Never downgrades.
    /// Returns whether the bound version changed.
    #[instrument(skip_all, fields(package = %pkg.name()))]
    pub fn update(&self, pkg: &mut Package) -> TrestleResult<bool> {
        if pkg.is_direct() {
            return Ok(false);
        }
        self.prepare(pkg)?;

        let versions = self.manager.list_versions(pkg.name())?;
        let Some(newest) = VersionResolver::resolve(pkg.requested(), &versions) else {
            debug!("Registry reports nothing newer, keeping current version");
            return Ok(false);
        };
        if pkg.resolved().is_some_and(|current| newest <= *current) {
            debug!(version = %newest, "Already up to date");
            return Ok(false);
        }

        let cached = pkg
            .cache_path_for(&newest)
            .is_some_and(|path| self.filesystem.exists(&path));
        if !cached {
            if let Some(store_dir) = pkg.store_dir() {
                self.install_version(pkg.name(), &newest, store_dir)?;
            }
        }
        info!(version = %newest, "Updated package");
        Ok(pkg.advance_to(newest))
    }

    /// Every complete copy under `store_dir`, sorted by name then version.
    ///
    /// Staging directories, lock files and foreign entries are skipped.
    pub fn entries(&self, store_dir: &Path) -> TrestleResult<Vec<CachedEntry>> {
        let mut entries: Vec<CachedEntry> = self
            .filesystem
            .list_dir(store_dir)?
            .into_iter()
            .filter(|name| !name.starts_with('.'))
            .filter_map(|file_name| match CacheKey::decode(&file_name) {
                Ok((name, version)) => Some(CachedEntry {
                    name,
                    version,
                    path: store_dir.join(&file_name),
                }),
                Err(e) => {
                    debug!(entry = %file_name, error = %e, "Skipping foreign cache entry");
                    None
                }
            })
            .collect();
        entries.sort();
        Ok(entries)
    }

    /// Remove cached copies, all of them or those of one package.
    ///
    /// Lock files of removed keys go too, as do staging directories left
    /// behind by interrupted installs. Each key is locked while it is
    /// cleaned, so an install in progress finishes first.
    pub fn remove(
        &self,
        store_dir: &Path,
        name: Option<&PackageName>,
    ) -> TrestleResult<Vec<CachedEntry>> {
        let selected = |pkg: &PackageName| name.is_none_or(|n| n == pkg);

        let doomed: Vec<_> = self
            .entries(store_dir)?
            .into_iter()
            .filter(|e| selected(&e.name))
            .collect();
        for entry in &doomed {
            let key = CacheKey::new(&entry.name, &entry.version);
            let _lock = self.filesystem.lock_exclusive(&lock_path(store_dir, key.as_str()))?;
            self.filesystem.remove_dir_all(&entry.path)?;
        }

        let mut leftovers = 0;
        for file_name in self.filesystem.list_dir(store_dir)? {
            let Some(key) = staging_key(&file_name).filter(|k| decodes_to(k, &selected)) else {
                continue;
            };
            let staging = store_dir.join(&file_name);
            let _lock = self.filesystem.lock_exclusive(&lock_path(store_dir, key))?;
            if self.filesystem.exists(&staging) {
                debug!(path = %staging.display(), "Removing abandoned staging directory");
                self.filesystem.remove_dir_all(&staging)?;
                leftovers += 1;
            }
        }

        // Listed again: the staging sweep above may have created lock files.
        for file_name in self.filesystem.list_dir(store_dir)? {
            let Some(key) = lock_key(&file_name).filter(|k| decodes_to(k, &selected)) else {
                continue;
            };
            if !self.filesystem.exists(&store_dir.join(key)) {
                self.filesystem.remove_file(&store_dir.join(&file_name))?;
                leftovers += 1;
            }
        }

        info!(removed = doomed.len(), leftovers, "Cleaned cache");
        Ok(doomed)
    }

    // -------------------------------------------------------------------------
    // Internal Helpers
    // -------------------------------------------------------------------------

    fn resolve(&self, name: &PackageName, request: &VersionRequest) -> TrestleResult<Version> {
        let versions = self.manager.list_versions(name)?;
        VersionResolver::resolve(request, &versions).ok_or_else(|| {
            let reason = if versions.is_empty() {
                "the registry lists no versions".to_string()
            } else {
                format!("none of {} published versions match", versions.len())
            };
            ApplicationError::Resolution {
                package: name.to_string(),
                request: request.to_string(),
                reason,
            }
            .into()
        })
    }

    fn install_version(
        &self,
        name: &PackageName,
        version: &Version,
        store_dir: &Path,
    ) -> TrestleResult<PathBuf> {
        let key = CacheKey::new(name, version);
        let destination = store_dir.join(key.as_str());

        self.filesystem.create_dir_all(store_dir)?;
        let _lock = self.filesystem.lock_exclusive(&lock_path(store_dir, key.as_str()))?;

        // Another dispatch may have finished this key while we waited.
        if self.filesystem.exists(&destination) {
            debug!(key = %key, "Cache entry already present");
            return Ok(destination);
        }

        let staging = store_dir.join(format!("{STAGING_PREFIX}{key}-{}", std::process::id()));
        if self.filesystem.exists(&staging) {
            self.filesystem.remove_dir_all(&staging)?;
        }
        self.filesystem.create_dir_all(&staging)?;

        info!(package = %name, version = %version, "Installing package");
        let result = self
            .manager
            .fetch(name, version, &staging)
            .and_then(|()| self.filesystem.rename(&staging, &destination));

        match result {
            Ok(()) => Ok(destination),
            Err(e) => {
                warn!(error = %e, "Install failed, removing staging directory");
                self.rollback(&staging);
                Err(e)
            }
        }
    }

    /// Best-effort rollback on failure.
    fn rollback(&self, staging: &Path) {
        if let Err(e) = self.filesystem.remove_dir_all(staging) {
            warn!(error = %e, path = %staging.display(), "Rollback failed");
        }
    }
}

fn lock_path(store_dir: &Path, key: &str) -> PathBuf {
    store_dir.join(format!(".{key}{LOCK_SUFFIX}"))
}

/// `.staging-<key>-<pid>` to `<key>`.
fn staging_key(file_name: &str) -> Option<&str> {
    let (key, pid) = file_name.strip_prefix(STAGING_PREFIX)?.rsplit_once('-')?;
    pid.chars().all(|c| c.is_ascii_digit()).then_some(key)
}

/// `.<key>.lock` to `<key>`.
fn lock_key(file_name: &str) -> Option<&str> {
    if file_name.starts_with(STAGING_PREFIX) {
        return None;
    }
    file_name.strip_prefix('.')?.strip_suffix(LOCK_SUFFIX)
}

fn decodes_to(key: &str, selected: impl Fn(&PackageName) -> bool) -> bool {
    CacheKey::decode(key).is_ok_and(|(name, _)| selected(&name))
}
