//! Local filesystem adapter using std::fs.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use fs2::FileExt;
use trestle_core::{
    application::{ApplicationError, ports::{Filesystem, LockGuard}},
    error::{TrestleError, TrestleResult},
};

/// Production filesystem implementation using `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

/// Exclusive advisory lock; released when the file handle closes.
struct CacheLock {
    _file: File,
}

impl Filesystem for LocalFilesystem {
    fn create_dir_all(&self, path: &Path) -> TrestleResult<()> {
        std::fs::create_dir_all(path).map_err(|e| map_io_error(path, e, "create directory"))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_to_string(&self, path: &Path) -> TrestleResult<String> {
        std::fs::read_to_string(path).map_err(|e| map_io_error(path, e, "read file"))
    }

    fn list_dir(&self, path: &Path) -> TrestleResult<Vec<String>> {
        let entries = match std::fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(map_io_error(path, e, "read directory")),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| map_io_error(path, e, "read directory"))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn rename(&self, from: &Path, to: &Path) -> TrestleResult<()> {
        if to.exists() {
            return Err(map_io_error(
                to,
                io::Error::from(io::ErrorKind::AlreadyExists),
                "move into place",
            ));
        }
        std::fs::rename(from, to).map_err(|e| map_io_error(from, e, "move into place"))
    }

    fn remove_dir_all(&self, path: &Path) -> TrestleResult<()> {
        std::fs::remove_dir_all(path).map_err(|e| map_io_error(path, e, "remove directory"))
    }

    fn remove_file(&self, path: &Path) -> TrestleResult<()> {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                Err(map_io_error(path, e, "remove file"))
            }
            _ => Ok(()),
        }
    }

    fn lock_exclusive(&self, path: &Path) -> TrestleResult<LockGuard> {
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| map_io_error(path, e, "open lock file"))?;
        FileExt::lock_exclusive(&file).map_err(|e| map_io_error(path, e, "lock"))?;
        Ok(Box::new(CacheLock { _file: file }))
    }
}

fn map_io_error(path: &Path, e: io::Error, operation: &str) -> TrestleError {
    ApplicationError::Filesystem {
        path: path.to_path_buf(),
        reason: format!("Failed to {}: {}", operation, e),
    }
    .into()
}
