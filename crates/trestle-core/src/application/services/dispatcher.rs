//! Command dispatcher - command name in, child exit status out.
//!
//! One dispatch walks these states strictly in order:
//!
//! ```text
//! Resolving ─► Ensuring ─► LocatingEntry ─► Dispatched ─► Completed
//!     │            │             │               │
//!     └────────────┴─────────────┴───────────────┴──────► Failed
//! ```
//!
//! Unknown commands fail in `Resolving`, before any collaborator is touched.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use semver::Version;
use tracing::{debug, info, instrument};

use crate::{
    application::{
        ApplicationError,
        ports::{ChildExit, Filesystem, LaunchRequest, PackageManager, ProcessLauncher},
        services::{entry_resolver::EntryResolver, package_cache::PackageCache},
    },
    domain::{CommandContext, CommandRegistry, Package, PackageName, VersionRequest},
    error::{Context, TrestleError, TrestleResult},
};

pub const DEPENDENCIES_DIR: &str = "dependencies";
pub const STORE_DIR: &str = "node_modules";

/// Where cached packages live under the tool's home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    pub target_dir: PathBuf,
    pub store_dir: PathBuf,
}

impl CacheLayout {
    /// `<home>/dependencies` and `<home>/dependencies/node_modules`.
    pub fn under(home: &Path) -> Self {
        let target_dir = home.join(DEPENDENCIES_DIR);
        let store_dir = target_dir.join(STORE_DIR);
        Self { target_dir, store_dir }
    }
}

/// Invoker-supplied overrides. Either one disables the update step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOverrides {
    /// Run the package found at this path (direct mode).
    pub target_path: Option<PathBuf>,
    /// Use this version request instead of the binding's.
    pub version: Option<VersionRequest>,
}

impl DispatchOverrides {
    pub fn is_pinned(&self) -> bool {
        self.target_path.is_some() || self.version.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Resolving,
    Ensuring,
    LocatingEntry,
    Dispatched,
    Completed,
    Failed,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resolving => "resolving",
            Self::Ensuring => "ensuring",
            Self::LocatingEntry => "locating-entry",
            Self::Dispatched => "dispatched",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What ran, once a dispatch completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub package: PackageName,
    /// `None` in direct mode.
    pub version: Option<Version>,
    pub entry: PathBuf,
}

/// Top-level orchestrator.
pub struct CommandDispatcher {
    registry: CommandRegistry,
    layout: CacheLayout,
    cache: PackageCache,
    entries: EntryResolver,
    launcher: Arc<dyn ProcessLauncher>,
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl CommandDispatcher {
    pub fn new(
        registry: CommandRegistry,
        layout: CacheLayout,
        filesystem: Arc<dyn Filesystem>,
        manager: Arc<dyn PackageManager>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            registry,
            layout,
            cache: PackageCache::new(filesystem.clone(), manager),
            entries: EntryResolver::new(filesystem),
            launcher,
            working_dir: PathBuf::from("."),
            timeout: None,
        }
    }

    /// Working directory of dispatched children.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Kill children that run longer than this.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn cache(&self) -> &PackageCache {
        &self.cache
    }

    /// Run `command` with `context` in a child process.
    #[instrument(skip_all, fields(command = %command))]
    pub fn dispatch(
        &self,
        command: &str,
        context: &CommandContext,
        overrides: &DispatchOverrides,
    ) -> TrestleResult<DispatchOutcome> {
        let mut state = DispatchState::Resolving;
        match self.run(command, context, overrides, &mut state) {
            Ok(outcome) => {
                debug!(from = %state, to = %DispatchState::Completed, "Dispatch state");
                Ok(outcome)
            }
            Err(e) => {
                debug!(from = %state, to = %DispatchState::Failed, error = %e, "Dispatch state");
                Err(e)
            }
        }
    }

    fn run(
        &self,
        command: &str,
        context: &CommandContext,
        overrides: &DispatchOverrides,
        state: &mut DispatchState,
    ) -> TrestleResult<DispatchOutcome> {
        debug!(state = %state, "Dispatch state");
        let binding = self.registry.get(command).ok_or_else(|| ApplicationError::UnknownCommand {
            name: command.to_string(),
            available: self.registry.commands().map(str::to_string).collect(),
        })?;
        let requested = overrides.version.clone().unwrap_or_else(|| binding.version.clone());
        let mut package = match &overrides.target_path {
            Some(path) => Package::direct(binding.package.clone(), requested, path),
            None => Package::cached(
                binding.package.clone(),
                requested,
                &self.layout.target_dir,
                &self.layout.store_dir,
            ),
        };

        transition(state, DispatchState::Ensuring);
        self.ensure(&mut package, overrides)?;

        transition(state, DispatchState::LocatingEntry);
        let root = package.root_dir().ok_or_else(|| TrestleError::Internal {
            message: format!("{} has no root directory after install", package.name()),
        })?;
        let entry = self
            .entries
            .resolve(&root, Some(package.name()))?
            .ok_or_else(|| ApplicationError::EntryMissing {
                package: package.name().to_string(),
                root: root.clone(),
            })?;

        transition(state, DispatchState::Dispatched);
        let request = LaunchRequest {
            entry: entry.clone(),
            context_json: context.to_json().context("serializing command context")?,
            working_dir: self.working_dir.clone(),
            timeout: self.timeout,
        };
        let version = package
            .resolved()
            .map_or_else(|| "direct".to_string(), ToString::to_string);
        info!(package = %package.name(), %version, "Dispatching");

        match self.launcher.launch(&request)? {
            ChildExit::Code(0) => Ok(DispatchOutcome {
                package: package.name().clone(),
                version: package.resolved().cloned(),
                entry,
            }),
            ChildExit::Code(code) => Err(ApplicationError::NonZeroExit { code }.into()),
            ChildExit::Signal(signal) => Err(ApplicationError::ChildTerminated { signal }.into()),
            ChildExit::TimedOut(after) => Err(ApplicationError::ChildTimedOut {
                seconds: after.as_secs(),
            }
            .into()),
        }
    }

    /// Install when absent, otherwise update unless the invoker pinned.
    fn ensure(&self, package: &mut Package, overrides: &DispatchOverrides) -> TrestleResult<()> {
        if self.cache.exists(package)? {
            if !overrides.is_pinned() {
                self.cache.update(package)?;
            }
            Ok(())
        } else {
            self.cache.install(package)
        }
    }
}

fn transition(state: &mut DispatchState, next: DispatchState) {
    debug!(from = %state, to = %next, "Dispatch state");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{
        fakes::FakeFilesystem,
        ports::{MockPackageManager, MockProcessLauncher},
    };
    use crate::domain::{CacheKey, CommandBinding};
    use mockall::predicate::*;

    const HOME: &str = "/home/u/.trestle";

    fn registry() -> CommandRegistry {
        let binding: CommandBinding = "scaffold/init".parse().unwrap();
        CommandRegistry::new().with_binding("init", binding)
    }

    fn key_dir(version: &str) -> PathBuf {
        let name = PackageName::new("scaffold/init").unwrap();
        CacheLayout::under(Path::new(HOME))
            .store_dir
            .join(CacheKey::new(&name, &Version::parse(version).unwrap()).as_str())
    }

    /// Registry publishing `["1.0.0", "1.2.0"]` whose fetch writes a manifest.
    fn registry_with_init(fs: &Arc<FakeFilesystem>, fetches: usize) -> MockPackageManager {
        let mut manager = MockPackageManager::new();
        manager
            .expect_list_versions()
            .returning(|_| Ok(vec!["1.0.0".into(), "1.2.0".into()]));
        let writer = fs.clone();
        manager
            .expect_fetch()
            .with(always(), eq(Version::new(1, 2, 0)), always())
            .times(fetches)
            .returning(move |_, _, dest| {
                let manifest = r#"{"name":"scaffold/init","main":"lib/index.js"}"#;
                writer.write(dest.join("package.json"), manifest);
                Ok(())
            });
        manager
    }

    fn dispatcher(
        fs: Arc<FakeFilesystem>,
        manager: MockPackageManager,
        launcher: MockProcessLauncher,
    ) -> CommandDispatcher {
        CommandDispatcher::new(
            registry(),
            CacheLayout::under(Path::new(HOME)),
            fs,
            Arc::new(manager),
            Arc::new(launcher),
        )
        .with_working_dir("/work")
    }

    fn init_context() -> CommandContext {
        CommandContext::new().with_argument("my-app").with_flag("force", true)
    }

    #[test]
    fn layout_under_home() {
        let layout = CacheLayout::under(Path::new(HOME));
        assert_eq!(layout.target_dir, PathBuf::from("/home/u/.trestle/dependencies"));
        assert_eq!(
            layout.store_dir,
            PathBuf::from("/home/u/.trestle/dependencies/node_modules")
        );
    }

    #[test]
    fn init_installs_latest_and_runs_entry() {
        let fs = Arc::new(FakeFilesystem::new());
        let manager = registry_with_init(&fs, 1);
        let mut launcher = MockProcessLauncher::new();
        let expected_entry = key_dir("1.2.0").join("lib/index.js");
        launcher
            .expect_launch()
            .withf(move |req| {
                let ctx: serde_json::Value = serde_json::from_str(&req.context_json).unwrap();
                let expected = serde_json::json!({
                    "positionalArguments": ["my-app"],
                    "flags": {"force": true}
                });
                req.entry == expected_entry
                    && req.working_dir == Path::new("/work")
                    && ctx == expected
            })
            .times(1)
            .returning(|_| Ok(ChildExit::Code(0)));

        let outcome = dispatcher(fs.clone(), manager, launcher)
            .dispatch("init", &init_context(), &DispatchOverrides::default())
            .unwrap();

        assert_eq!(outcome.version, Some(Version::new(1, 2, 0)));
        assert!(fs.is_dir(key_dir("1.2.0")));
    }

    #[test]
    fn child_failure_code_is_preserved_without_retry() {
        let fs = Arc::new(FakeFilesystem::new());
        let manager = registry_with_init(&fs, 1);
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_launch()
            .times(1)
            .returning(|_| Ok(ChildExit::Code(1)));

        let err = dispatcher(fs, manager, launcher)
            .dispatch("init", &init_context(), &DispatchOverrides::default())
            .unwrap_err();

        assert!(matches!(
            err,
            TrestleError::Application(ApplicationError::NonZeroExit { code: 1 })
        ));
        assert_eq!(err.child_exit_code(), Some(1));
    }

    #[test]
    fn unknown_command_touches_nothing() {
        let fs = Arc::new(FakeFilesystem::new());
        let mut manager = MockPackageManager::new();
        manager.expect_list_versions().never();
        manager.expect_fetch().never();
        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().never();

        let err = dispatcher(fs.clone(), manager, launcher)
            .dispatch("frobnicate", &CommandContext::new(), &DispatchOverrides::default())
            .unwrap_err();

        match err {
            TrestleError::Application(ApplicationError::UnknownCommand { name, available }) => {
                assert_eq!(name, "frobnicate");
                assert_eq!(available, vec!["init"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(fs.calls(), 0);
    }

    #[test]
    fn missing_entry_never_spawns() {
        let fs = Arc::new(FakeFilesystem::new().with_file(
            key_dir("1.2.0").join("package.json"),
            r#"{"name":"scaffold/init"}"#,
        ));
        let mut manager = MockPackageManager::new();
        manager
            .expect_list_versions()
            .returning(|_| Ok(vec!["1.0.0".into(), "1.2.0".into()]));
        manager.expect_fetch().never();
        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().never();

        let err = dispatcher(fs, manager, launcher)
            .dispatch("init", &init_context(), &DispatchOverrides::default())
            .unwrap_err();

        assert!(matches!(
            err,
            TrestleError::Application(ApplicationError::EntryMissing { .. })
        ));
    }

    #[test]
    fn cached_package_is_updated_without_refetch() {
        let fs = Arc::new(FakeFilesystem::new().with_file(
            key_dir("1.2.0").join("package.json"),
            r#"{"main":"index.js"}"#,
        ));
        let manager = registry_with_init(&fs, 0);
        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().times(1).returning(|_| Ok(ChildExit::Code(0)));

        let outcome = dispatcher(fs, manager, launcher)
            .dispatch("init", &init_context(), &DispatchOverrides::default())
            .unwrap();
        assert_eq!(outcome.entry, key_dir("1.2.0").join("index.js"));
    }

    #[test]
    fn pinned_version_skips_update() {
        let fs = Arc::new(FakeFilesystem::new().with_file(
            key_dir("1.0.0").join("package.json"),
            r#"{"main":"index.js"}"#,
        ));
        let mut manager = MockPackageManager::new();
        manager.expect_list_versions().never();
        manager.expect_fetch().never();
        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().times(1).returning(|_| Ok(ChildExit::Code(0)));

        let overrides = DispatchOverrides {
            version: Some(VersionRequest::Exact(Version::new(1, 0, 0))),
            ..Default::default()
        };
        let outcome = dispatcher(fs, manager, launcher)
            .dispatch("init", &init_context(), &overrides)
            .unwrap();
        assert_eq!(outcome.version, Some(Version::new(1, 0, 0)));
    }

    #[test]
    fn direct_mode_runs_target_path_without_registry() {
        let fs = Arc::new(
            FakeFilesystem::new().with_file("/src/init/package.json", r#"{"main":"./index.js"}"#),
        );
        let mut manager = MockPackageManager::new();
        manager.expect_list_versions().never();
        manager.expect_fetch().never();
        let mut launcher = MockProcessLauncher::new();
        launcher
            .expect_launch()
            .withf(|req| req.entry == Path::new("/src/init/index.js"))
            .times(1)
            .returning(|_| Ok(ChildExit::Code(0)));

        let overrides = DispatchOverrides {
            target_path: Some(PathBuf::from("/src/init")),
            ..Default::default()
        };
        let outcome = dispatcher(fs, manager, launcher)
            .dispatch("init", &init_context(), &overrides)
            .unwrap();
        assert_eq!(outcome.version, None);
    }

    #[test]
    fn direct_mode_missing_target_is_reported() {
        let fs = Arc::new(FakeFilesystem::new());
        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().never();

        let overrides = DispatchOverrides {
            target_path: Some(PathBuf::from("/nowhere")),
            ..Default::default()
        };
        let err = dispatcher(fs, MockPackageManager::new(), launcher)
            .dispatch("init", &init_context(), &overrides)
            .unwrap_err();
        assert!(matches!(
            err,
            TrestleError::Application(ApplicationError::TargetMissing { .. })
        ));
    }

    #[test]
    fn spawn_failure_differs_from_child_failure() {
        let fs = Arc::new(FakeFilesystem::new());
        let manager = registry_with_init(&fs, 1);
        let mut launcher = MockProcessLauncher::new();
        launcher.expect_launch().returning(|_| {
            Err(ApplicationError::Spawn {
                program: "node".into(),
                reason: "No such file or directory".into(),
            }
            .into())
        });

        let err = dispatcher(fs, manager, launcher)
            .dispatch("init", &init_context(), &DispatchOverrides::default())
            .unwrap_err();
        assert!(matches!(err, TrestleError::Application(ApplicationError::Spawn { .. })));
        assert_eq!(err.child_exit_code(), None);
    }

    #[test]
    fn signal_and_timeout_are_reported() {
        for (exit, expect_timeout) in [
            (ChildExit::Signal(Some(9)), false),
            (ChildExit::TimedOut(Duration::from_secs(30)), true),
        ] {
            let fs = Arc::new(FakeFilesystem::new());
            let manager = registry_with_init(&fs, 1);
            let mut launcher = MockProcessLauncher::new();
            launcher.expect_launch().returning(move |_| Ok(exit));

            let err = dispatcher(fs, manager, launcher)
                .with_timeout(Some(Duration::from_secs(30)))
                .dispatch("init", &init_context(), &DispatchOverrides::default())
                .unwrap_err();
            if expect_timeout {
                assert!(matches!(
                    err,
                    TrestleError::Application(ApplicationError::ChildTimedOut { seconds: 30 })
                ));
            } else {
                assert!(matches!(
                    err,
                    TrestleError::Application(ApplicationError::ChildTerminated { signal: Some(9) })
                ));
            }
        }
    }
}
