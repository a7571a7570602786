//! In-memory filesystem adapter for testing.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
};

use trestle_core::{
    application::{ApplicationError, ports::{Filesystem, LockGuard}},
    error::{TrestleError, TrestleResult},
};

/// In-memory filesystem for testing.
///
/// Clones share state. Locks are recorded but never contended.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
    locks: Arc<Mutex<Vec<PathBuf>>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, String>,
    directories: BTreeSet<PathBuf>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a file, creating parent directories (testing helper).
    pub fn write_file(&self, path: impl AsRef<Path>, content: &str) -> TrestleResult<()> {
        let path = path.as_ref();
        let mut inner = self.inner.write().map_err(|_| poisoned(path))?;
        if let Some(parent) = path.parent() {
            insert_ancestors(&mut inner.directories, parent);
        }
        inner.files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    /// Read a file's content (testing helper).
    pub fn read_file(&self, path: &Path) -> Option<String> {
        let inner = self.inner.read().ok()?;
        inner.files.get(path).cloned()
    }

    /// List all files.
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.inner
            .read()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Lock files requested so far.
    pub fn locks(&self) -> Vec<PathBuf> {
        self.locks.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

fn poisoned(path: &Path) -> TrestleError {
    ApplicationError::Filesystem {
        path: path.to_path_buf(),
        reason: "memory filesystem lock poisoned".into(),
    }
    .into()
}

fn not_found(path: &Path) -> TrestleError {
    ApplicationError::Filesystem {
        path: path.to_path_buf(),
        reason: "No such file or directory".into(),
    }
    .into()
}

fn insert_ancestors(directories: &mut BTreeSet<PathBuf>, path: &Path) {
    let mut current = PathBuf::new();
    for component in path.components() {
        current.push(component);
        directories.insert(current.clone());
    }
}

impl Filesystem for MemoryFilesystem {
    fn create_dir_all(&self, path: &Path) -> TrestleResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned(path))?;
        insert_ancestors(&mut inner.directories, path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner
            .read()
            .map(|inner| inner.files.contains_key(path) || inner.directories.contains(path))
            .unwrap_or(false)
    }

    fn read_to_string(&self, path: &Path) -> TrestleResult<String> {
        let inner = self.inner.read().map_err(|_| poisoned(path))?;
        inner.files.get(path).cloned().ok_or_else(|| not_found(path))
    }

    fn list_dir(&self, path: &Path) -> TrestleResult<Vec<String>> {
        let inner = self.inner.read().map_err(|_| poisoned(path))?;
        let names: BTreeSet<String> = inner
            .directories
            .iter()
            .chain(inner.files.keys())
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        Ok(names.into_iter().collect())
    }

    fn rename(&self, from: &Path, to: &Path) -> TrestleResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned(from))?;
        if inner.files.contains_key(to) || inner.directories.contains(to) {
            return Err(ApplicationError::Filesystem {
                path: to.to_path_buf(),
                reason: "destination already exists".into(),
            }
            .into());
        }
        if !inner.files.contains_key(from) && !inner.directories.contains(from) {
            return Err(not_found(from));
        }

        let relocate = |p: &PathBuf| p.strip_prefix(from).ok().map(|rest| to.join(rest));

        let dirs: Vec<(PathBuf, PathBuf)> = inner
            .directories
            .iter()
            .filter_map(|p| relocate(p).map(|n| (p.clone(), n)))
            .collect();
        for (old, new) in dirs {
            inner.directories.remove(&old);
            inner.directories.insert(new);
        }

        let files: Vec<(PathBuf, PathBuf)> = inner
            .files
            .keys()
            .filter_map(|p| relocate(p).map(|n| (p.clone(), n)))
            .collect();
        for (old, new) in files {
            if let Some(content) = inner.files.remove(&old) {
                inner.files.insert(new, content);
            }
        }
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> TrestleResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned(path))?;
        inner.directories.retain(|p| !p.starts_with(path));
        inner.files.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> TrestleResult<()> {
        let mut inner = self.inner.write().map_err(|_| poisoned(path))?;
        inner.files.remove(path);
        Ok(())
    }

    fn lock_exclusive(&self, path: &Path) -> TrestleResult<LockGuard> {
        self.locks
            .lock()
            .map_err(|_| poisoned(path))?
            .push(path.to_path_buf());
        Ok(Box::new(()))
    }
}
