//! End-to-end dispatches over the real adapters.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use semver::Version;
use tempfile::TempDir;
use trestle_adapters::{
    ChildProcessLauncher, LocalFilesystem, LocalRegistry, MemoryFilesystem, Runtime,
};
use trestle_core::{
    application::{ApplicationError, ports::Filesystem},
    prelude::*,
};

fn publish(registry: &Path, version: &str, body: &str) {
    let dir = registry.join("scaffold").join("init").join(version);
    std::fs::create_dir_all(&dir).unwrap();
    let manifest = r#"{"name":"scaffold/init","main":"bin/run.sh"}"#;
    std::fs::write(dir.join("package.json"), manifest).unwrap();
    std::fs::create_dir_all(dir.join("bin")).unwrap();
    std::fs::write(dir.join("bin").join("run.sh"), body).unwrap();
}

struct Workspace {
    _tmp: TempDir,
    home: PathBuf,
    registry: PathBuf,
    cwd: PathBuf,
}

fn workspace() -> Workspace {
    let tmp = TempDir::new().unwrap();
    let home = tmp.path().join("home");
    let registry = tmp.path().join("registry");
    let cwd = tmp.path().join("cwd");
    std::fs::create_dir_all(&cwd).unwrap();
    Workspace {
        _tmp: tmp,
        home,
        registry,
        cwd,
    }
}

fn dispatcher(ws: &Workspace) -> CommandDispatcher {
    CommandDispatcher::new(
        CommandRegistry::new().with_binding("init", "scaffold/init".parse().unwrap()),
        CacheLayout::under(&ws.home),
        Arc::new(LocalFilesystem::new()),
        Arc::new(LocalRegistry::new(&ws.registry)),
        Arc::new(ChildProcessLauncher::new(Runtime::script("sh"))),
    )
    .with_working_dir(&ws.cwd)
}

fn init_context() -> CommandContext {
    CommandContext::new().with_argument("my-app").with_flag("force", true)
}

#[test]
#[cfg(unix)]
fn init_installs_newest_and_runs_it() {
    let ws = workspace();
    publish(&ws.registry, "1.0.0", "echo old > version.txt");
    publish(&ws.registry, "1.2.0", r#"printf '%s' "$1" > context.json; echo new > version.txt"#);

    let outcome = dispatcher(&ws)
        .dispatch("init", &init_context(), &DispatchOverrides::default())
        .unwrap();

    assert_eq!(outcome.version, Some(Version::new(1, 2, 0)));
    assert_eq!(std::fs::read_to_string(ws.cwd.join("version.txt")).unwrap(), "new\n");
    let raw = std::fs::read_to_string(ws.cwd.join("context.json")).unwrap();
    let context: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        context,
        serde_json::json!({"positionalArguments": ["my-app"], "flags": {"force": true}})
    );

    let key = CacheKey::new(&PackageName::new("scaffold/init").unwrap(), &Version::new(1, 2, 0));
    let layout = CacheLayout::under(&ws.home);
    assert!(layout.store_dir.join(key.as_str()).join("package.json").is_file());

    let leftovers: Vec<_> = std::fs::read_dir(&layout.store_dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with(".staging-"))
        .collect();
    assert!(leftovers.is_empty(), "staging left behind: {leftovers:?}");
}

#[test]
#[cfg(unix)]
fn child_exit_code_is_reported() {
    let ws = workspace();
    publish(&ws.registry, "1.2.0", "exit 1");

    let err = dispatcher(&ws)
        .dispatch("init", &init_context(), &DispatchOverrides::default())
        .unwrap_err();

    assert_eq!(err.child_exit_code(), Some(1));
}

#[test]
#[cfg(unix)]
fn newer_release_is_picked_up_on_next_dispatch() {
    let ws = workspace();
    publish(&ws.registry, "1.0.0", "echo 1.0.0 > version.txt");
    dispatcher(&ws)
        .dispatch("init", &init_context(), &DispatchOverrides::default())
        .unwrap();

    publish(&ws.registry, "1.1.0", "echo 1.1.0 > version.txt");
    let outcome = dispatcher(&ws)
        .dispatch("init", &init_context(), &DispatchOverrides::default())
        .unwrap();

    assert_eq!(outcome.version, Some(Version::new(1, 1, 0)));
    assert_eq!(std::fs::read_to_string(ws.cwd.join("version.txt")).unwrap(), "1.1.0\n");
}

#[test]
#[cfg(unix)]
fn unpublished_package_is_resolution_error() {
    let ws = workspace();
    std::fs::create_dir_all(&ws.registry).unwrap();

    let err = dispatcher(&ws)
        .dispatch("init", &init_context(), &DispatchOverrides::default())
        .unwrap_err();
    assert!(matches!(
        err,
        TrestleError::Application(ApplicationError::Resolution { .. })
    ));
}

#[test]
#[cfg(unix)]
fn direct_mode_runs_local_checkout() {
    let ws = workspace();
    let checkout = ws.cwd.join("init-checkout");
    std::fs::create_dir_all(&checkout).unwrap();
    std::fs::write(checkout.join("package.json"), r#"{"main":"./go.sh"}"#).unwrap();
    std::fs::write(checkout.join("go.sh"), "echo direct > mode.txt").unwrap();

    let overrides = DispatchOverrides {
        target_path: Some(checkout.clone()),
        ..Default::default()
    };
    let outcome = dispatcher(&ws).dispatch("init", &init_context(), &overrides).unwrap();

    assert_eq!(outcome.version, None);
    assert_eq!(outcome.entry, checkout.join("go.sh"));
    assert_eq!(std::fs::read_to_string(ws.cwd.join("mode.txt")).unwrap(), "direct\n");
    assert!(!CacheLayout::under(&ws.home).store_dir.exists());
}

// ── in-memory ────────────────────────────────────────────────────────────────

/// Registry that "installs" by writing a manifest into the memory filesystem.
struct MemoryRegistry {
    fs: MemoryFilesystem,
}

impl PackageManager for MemoryRegistry {
    fn list_versions(&self, _name: &PackageName) -> TrestleResult<Vec<String>> {
        Ok(vec!["0.9.0".into(), "1.0.0".into(), "1.0.0-beta.1".into()])
    }

    fn fetch(
        &self,
        _name: &PackageName,
        _version: &Version,
        destination: &Path,
    ) -> TrestleResult<()> {
        self.fs
            .write_file(destination.join("package.json"), r#"{"main":"index.js"}"#)
    }
}

#[derive(Default)]
struct Recorder {
    entries: Mutex<Vec<PathBuf>>,
}

impl ProcessLauncher for Recorder {
    fn launch(&self, request: &LaunchRequest) -> TrestleResult<ChildExit> {
        self.entries.lock().unwrap().push(request.entry.clone());
        Ok(ChildExit::Code(0))
    }
}

#[test]
fn memory_filesystem_supports_full_dispatch() {
    let fs = MemoryFilesystem::new();
    let launcher = Arc::new(Recorder::default());
    let dispatcher = CommandDispatcher::new(
        CommandRegistry::builtin(),
        CacheLayout::under(Path::new("/home/u/.trestle")),
        Arc::new(fs.clone()),
        Arc::new(MemoryRegistry { fs: fs.clone() }),
        launcher.clone(),
    );

    let outcome = dispatcher
        .dispatch("init", &init_context(), &DispatchOverrides::default())
        .unwrap();

    assert_eq!(outcome.version, Some(Version::new(1, 0, 0)));
    assert_eq!(fs.locks().len(), 1);
    let entries = launcher.entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert!(fs.exists(entries[0].parent().unwrap()));
    assert!(entries[0].ends_with("index.js"));
}
