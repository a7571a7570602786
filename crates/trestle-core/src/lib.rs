//! Trestle Core - Hexagonal Architecture Implementation
//!
//! Domain and application layers of the Trestle command dispatcher: a
//! command name is bound to a versioned package, the package is fetched
//! into a local cache, and its entry point runs in a child process.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           trestle-cli (CLI)             │
//! │   clap front end, config, exit codes    │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │  Lifecycle, CommandDispatcher,          │
//! │  PackageCache, EntryResolver            │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      Application Ports (Traits)         │
//! │  Filesystem, PackageManager,            │
//! │  ProcessLauncher, RuntimeProbe          │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │    trestle-adapters (Infrastructure)    │
//! │  LocalFilesystem, NpmCli, LocalRegistry,│
//! │  ChildProcessLauncher                   │
//! └─────────────────────────────────────────┘
//!
//!  Domain layer (pure): VersionResolver, CacheKey, Package,
//!  CommandContext, CommandRegistry
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use trestle_core::prelude::*;
//! # fn run(
//! #     fs: Arc<dyn Filesystem>,
//! #     npm: Arc<dyn PackageManager>,
//! #     launcher: Arc<dyn ProcessLauncher>,
//! #     probe: Arc<dyn RuntimeProbe>,
//! # ) -> TrestleResult<()> {
//! let dispatcher = CommandDispatcher::new(
//!     CommandRegistry::builtin(),
//!     CacheLayout::under("/home/me/.trestle".as_ref()),
//!     fs,
//!     npm,
//!     launcher,
//! );
//! let command = DispatchCommand::new(&dispatcher, "init", DispatchOverrides::default());
//! Lifecycle::new(probe).run(command, vec![
//!     serde_json::json!("my-app"),
//!     serde_json::json!({ "force": true }),
//! ])?;
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod domain;
pub mod error;

/// Public API - what external crates should use.
pub mod prelude {
    pub use crate::application::{
        CacheLayout, ChildExit, Command, CommandDispatcher, DispatchCommand, DispatchOutcome,
        DispatchOverrides, Lifecycle, PackageCache, SelfUpdateCheck,
        ports::{Filesystem, LaunchRequest, PackageManager, ProcessLauncher, RuntimeProbe},
    };
    pub use crate::domain::{
        CacheKey, CommandBinding, CommandContext, CommandRegistry, Package, PackageName,
        VersionRequest, VersionResolver,
    };
    pub use crate::error::{TrestleError, TrestleResult};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
