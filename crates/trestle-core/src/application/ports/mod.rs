//! Application ports (traits) for external dependencies.
//!
//! Ports define what the application needs from the outside world.
//! Adapters in `trestle-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: called by the application, implemented by infrastructure
//!   - `Filesystem`: cache directory operations and locking
//!   - `PackageManager`: version listing and fetching
//!   - `ProcessLauncher`: running an entry point in a child process
//!   - `RuntimeProbe`: host runtime version
//!
//! - **Driving (Input) Ports**: the `Command` lifecycle in `services::lifecycle`

pub mod output;

pub use output::{
    ChildExit, Filesystem, LaunchRequest, LockGuard, PackageManager, ProcessLauncher, RuntimeProbe,
};

#[cfg(test)]
pub use output::{MockFilesystem, MockPackageManager, MockProcessLauncher, MockRuntimeProbe};
