//! Driven (output) ports - implemented by infrastructure.
//!
//! These traits define what dispatch needs from external systems.
//! The `trestle-adapters` crate provides implementations.

use std::path::{Path, PathBuf};
use std::time::Duration;

use semver::Version;

use crate::domain::PackageName;
use crate::error::TrestleResult;

/// Held for as long as an exclusive cache lock is needed; dropping it
/// releases the lock.
pub type LockGuard = Box<dyn Send>;

/// Port for filesystem operations.
///
/// Implemented by:
/// - `trestle_adapters::filesystem::LocalFilesystem` (production)
/// - `trestle_adapters::filesystem::MemoryFilesystem` (testing)
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Create a directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> TrestleResult<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Read a whole file as UTF-8.
    fn read_to_string(&self, path: &Path) -> TrestleResult<String>;

    /// Names of the direct children of a directory. A missing directory
    /// has no children.
    fn list_dir(&self, path: &Path) -> TrestleResult<Vec<String>>;

    /// Move a file or directory. The destination must not exist.
    fn rename(&self, from: &Path, to: &Path) -> TrestleResult<()>;

    /// Remove a directory and all contents.
    fn remove_dir_all(&self, path: &Path) -> TrestleResult<()>;

    /// Remove a single file. A missing file is not an error.
    fn remove_file(&self, path: &Path) -> TrestleResult<()>;

    /// Take an exclusive advisory lock on `path`, creating it if needed.
    /// Blocks until the lock is available.
    fn lock_exclusive(&self, path: &Path) -> TrestleResult<LockGuard>;
}

/// Port for the registry / installer collaborator.
///
/// The core never parses transport responses itself; it only sees version
/// strings and success or failure.
#[cfg_attr(test, mockall::automock)]
pub trait PackageManager: Send + Sync {
    /// Every version string the registry publishes for `name`. May be empty.
    fn list_versions(&self, name: &PackageName) -> TrestleResult<Vec<String>>;

    /// Materialize `name@version` into `destination`, which exists and is
    /// empty. Failures are reported as `ApplicationError::Install`.
    fn fetch(&self, name: &PackageName, version: &Version, destination: &Path) -> TrestleResult<()>;
}

/// Everything the spawn primitive needs to run one entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Absolute path of the entry file.
    pub entry: PathBuf,
    /// Serialized `CommandContext`.
    pub context_json: String,
    /// Working directory of the child.
    pub working_dir: PathBuf,
    /// Kill the child after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// How a child that did start came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    /// The child exited on its own with this code.
    Code(i32),
    /// The child was killed without an exit code.
    Signal(Option<i32>),
    /// The opt-in timeout elapsed and the child was killed.
    TimedOut(Duration),
}

/// Port for running an entry point in a separate OS process.
///
/// Inherits the parent's standard streams. A child that cannot be started
/// at all is an `ApplicationError::Spawn`, never a `ChildExit`.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, request: &LaunchRequest) -> TrestleResult<ChildExit>;
}

/// Port for asking the host runtime which version it is.
#[cfg_attr(test, mockall::automock)]
pub trait RuntimeProbe: Send + Sync {
    /// `None` means the runtime has no version to check.
    fn version(&self) -> TrestleResult<Option<Version>>;
}
