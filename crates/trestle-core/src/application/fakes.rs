//! In-memory filesystem used by the service tests.
//!
//! Records every port call so tests can assert that a dispatch touched
//! nothing at all.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::application::{ApplicationError, ports::{Filesystem, LockGuard}};
use crate::error::TrestleResult;

#[derive(Default)]
struct State {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, String>,
    locks: Vec<PathBuf>,
}

#[derive(Default)]
pub struct FakeFilesystem {
    state: Mutex<State>,
    calls: AtomicUsize,
}

impl FakeFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(self, path: impl AsRef<Path>) -> Self {
        self.add_dir(path.as_ref());
        self
    }

    pub fn with_file(self, path: impl AsRef<Path>, content: &str) -> Self {
        self.write(path, content);
        self
    }

    /// Test-side write; not counted as a port call.
    pub fn write(&self, path: impl AsRef<Path>, content: &str) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_path_buf(), content.to_string());
    }

    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        self.state.lock().unwrap().dirs.contains(path.as_ref())
    }

    /// Number of port calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Lock files requested so far, in order.
    pub fn locks(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().locks.clone()
    }

    fn add_dir(&self, path: &Path) {
        let mut state = self.state.lock().unwrap();
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            state.dirs.insert(ancestor.to_path_buf());
        }
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn missing(path: &Path) -> crate::error::TrestleError {
    ApplicationError::Filesystem {
        path: path.to_path_buf(),
        reason: "not found".into(),
    }
    .into()
}

impl Filesystem for FakeFilesystem {
    fn create_dir_all(&self, path: &Path) -> TrestleResult<()> {
        self.hit();
        self.add_dir(path);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.hit();
        let state = self.state.lock().unwrap();
        state.dirs.contains(path) || state.files.contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> TrestleResult<String> {
        self.hit();
        self.state
            .lock()
            .unwrap()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| missing(path))
    }

    fn list_dir(&self, path: &Path) -> TrestleResult<Vec<String>> {
        self.hit();
        let state = self.state.lock().unwrap();
        let names = state
            .dirs
            .iter()
            .chain(state.files.keys())
            .filter(|p| p.parent() == Some(path))
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect::<BTreeSet<_>>();
        Ok(names.into_iter().collect())
    }

    fn rename(&self, from: &Path, to: &Path) -> TrestleResult<()> {
        self.hit();
        let mut state = self.state.lock().unwrap();
        if !state.dirs.contains(from) && !state.files.contains_key(from) {
            return Err(missing(from));
        }
        let moved = |p: &PathBuf| p.strip_prefix(from).ok().map(|rest| to.join(rest));

        let dirs: Vec<_> = state
            .dirs
            .iter()
            .filter_map(|p| moved(p).map(|n| (p.clone(), n)))
            .collect();
        for (old, new) in dirs {
            state.dirs.remove(&old);
            state.dirs.insert(new);
        }
        let files: Vec<_> = state
            .files
            .keys()
            .filter_map(|p| moved(p).map(|n| (p.clone(), n)))
            .collect();
        for (old, new) in files {
            if let Some(content) = state.files.remove(&old) {
                state.files.insert(new, content);
            }
        }
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> TrestleResult<()> {
        self.hit();
        let mut state = self.state.lock().unwrap();
        state.dirs.retain(|p| !p.starts_with(path));
        state.files.retain(|p, _| !p.starts_with(path));
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> TrestleResult<()> {
        self.hit();
        self.state.lock().unwrap().files.remove(path);
        Ok(())
    }

    fn lock_exclusive(&self, path: &Path) -> TrestleResult<LockGuard> {
        self.hit();
        self.state.lock().unwrap().locks.push(path.to_path_buf());
        Ok(Box::new(()))
    }
}
