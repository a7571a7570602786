//! Application services - orchestrate use cases.
//!
//! The dispatcher drives the package cache and the entry resolver, then
//! hands the entry point to a child process. The lifecycle wraps any
//! command, dispatch included, in the fixed four step driver.

pub mod dispatcher;
pub mod entry_resolver;
pub mod lifecycle;
pub mod package_cache;
pub mod self_update;

pub use dispatcher::{
    CacheLayout, CommandDispatcher, DispatchOutcome, DispatchOverrides, DispatchState,
};
pub use entry_resolver::{EntryResolver, MANIFEST_FILE};
pub use lifecycle::{Command, DEFAULT_MIN_RUNTIME, DispatchCommand, Lifecycle, normalize_arguments};
pub use package_cache::{CachedEntry, PackageCache};
pub use self_update::{SelfUpdateCheck, UpdateNotice};
