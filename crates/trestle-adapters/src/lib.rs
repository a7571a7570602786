//! Infrastructure adapters for Trestle.
//!
//! This crate implements the ports defined in `trestle_core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod filesystem;
pub mod package_manager;
pub mod process;

// Re-export commonly used adapters
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use package_manager::{DEFAULT_REGISTRY_URL, LocalRegistry, NpmCli};
pub use process::{ChildProcessLauncher, Runtime, platform_command};
