//! Command handlers, one module per subcommand.
//!
//! [`Services`] turns the loaded [`AppConfig`] into the concrete adapters
//! the core services run on. Every handler that touches the cache or
//! dispatches a package builds one.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use trestle_adapters::{ChildProcessLauncher, LocalFilesystem, LocalRegistry, NpmCli, Runtime};
use trestle_core::{
    application::{
        CacheLayout, CommandDispatcher, PackageCache,
        ports::{Filesystem, PackageManager},
    },
    domain::CommandRegistry,
};

use crate::config::{AppConfig, RegistryKind, RuntimeKind};
use crate::error::{CliError, CliResult, IntoCli};

pub mod cache;
pub mod completions;
pub mod config;
pub mod dispatch;
pub mod list;

/// Adapters and bindings derived from configuration.
pub struct Services {
    pub registry: CommandRegistry,
    pub layout: CacheLayout,
    pub filesystem: Arc<dyn Filesystem>,
    pub manager: Arc<dyn PackageManager>,
    pub launcher: Arc<ChildProcessLauncher>,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> CliResult<Self> {
        let home = config.home_dir()?;
        debug!(home = %home.display(), "Resolved CLI home");

        let manager: Arc<dyn PackageManager> = match config.registry.kind {
            RegistryKind::Npm => Arc::new(NpmCli::new(config.registry.url.clone())),
            RegistryKind::Local => Arc::new(LocalRegistry::new(config.local_registry_path()?)),
        };

        Ok(Self {
            registry: config.command_registry()?,
            layout: CacheLayout::under(&home),
            filesystem: Arc::new(LocalFilesystem::new()),
            manager,
            launcher: Arc::new(ChildProcessLauncher::new(runtime(config)?)),
        })
    }

    /// A dispatcher running children in the current directory.
    pub fn dispatcher(&self, config: &AppConfig) -> CliResult<CommandDispatcher> {
        let cwd = current_dir()?;
        Ok(CommandDispatcher::new(
            self.registry.clone(),
            self.layout.clone(),
            self.filesystem.clone(),
            self.manager.clone(),
            self.launcher.clone(),
        )
        .with_working_dir(cwd)
        .with_timeout(config.runtime.timeout()))
    }

    /// The cache on its own, for listing and cleaning.
    pub fn cache(&self) -> PackageCache {
        PackageCache::new(self.filesystem.clone(), self.manager.clone())
    }
}

fn runtime(config: &AppConfig) -> CliResult<Runtime> {
    let program = config.runtime.program.clone();
    match config.runtime.kind {
        RuntimeKind::Node => {
            Ok(program.map_or_else(Runtime::node, |program| Runtime::Node { program }))
        }
        RuntimeKind::Script => program.map(Runtime::script).ok_or_else(|| CliError::ConfigError {
            message: "runtime.program must be set when runtime.kind is \"script\"".into(),
            source: None,
        }),
    }
}

pub(crate) fn current_dir() -> CliResult<PathBuf> {
    std::env::current_dir().with_cli_context(|| "Cannot read the current directory")
}
