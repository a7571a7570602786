//! Application layer for Trestle.
//!
//! This layer contains:
//! - **Services**: dispatch orchestration (CommandDispatcher, PackageCache,
//!   EntryResolver, Lifecycle, SelfUpdateCheck)
//! - **Ports**: interface definitions (traits) for external dependencies
//! - **Errors**: the dispatch failure taxonomy
//!
//! Version selection, cache addressing and context shaping live in
//! `crate::domain`; this layer only sequences them around I/O.

pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod fakes;

pub use services::{
    CacheLayout, CachedEntry, Command, CommandDispatcher, DispatchCommand, DispatchOutcome,
    DispatchOverrides, DispatchState, EntryResolver, Lifecycle, PackageCache, SelfUpdateCheck,
    UpdateNotice,
};

pub use ports::{
    ChildExit, Filesystem, LaunchRequest, LockGuard, PackageManager, ProcessLauncher, RuntimeProbe,
};

pub use error::ApplicationError;
