//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value.  The
//! CLI layer owns config; the core crate only ever sees the values derived
//! from it (cache layout, registry bindings, runtime limits).
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (handled at the call-site, not here)
//! 2. `TRESTLE_*` environment variables, `__` separating nested keys
//!    (`TRESTLE_REGISTRY__KIND=local`)
//! 3. Config file (`--config FILE`, or `config.toml` in the platform config dir)
//! 4. Built-in defaults (always present)

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use semver::Version;
use serde::{Deserialize, Serialize};

use trestle_adapters::DEFAULT_REGISTRY_URL;
use trestle_core::domain::{CommandBinding, CommandRegistry};

use crate::error::{CliError, CliResult};

/// Prefix shared by every environment variable the CLI reads.
pub const ENV_PREFIX: &str = "TRESTLE";

/// Directory under the user's home used when `home` is not configured.
pub const DEFAULT_HOME_DIR: &str = ".trestle";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// CLI home; holds the dependency cache.
    pub home: Option<PathBuf>,
    /// Where packages come from.
    pub registry: RegistryConfig,
    /// How entry points are executed.
    pub runtime: RuntimeConfig,
    /// Extra `command = "package[@request]"` bindings.
    pub commands: BTreeMap<String, String>,
    /// Self-update notice.
    pub update_check: UpdateCheckConfig,
    /// Output settings.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    #[default]
    Npm,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub kind: RegistryKind,
    /// Registry URL handed to npm.
    pub url: String,
    /// Root of a directory-backed registry (`kind = "local"`).
    pub path: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            kind: RegistryKind::Npm,
            url: DEFAULT_REGISTRY_URL.into(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    #[default]
    Node,
    Script,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub kind: RuntimeKind,
    /// Interpreter executable; `node` for the node runtime.
    pub program: Option<String>,
    pub min_version: String,
    /// Kill the child after this many seconds. Unset waits forever.
    pub timeout_secs: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            kind: RuntimeKind::Node,
            program: None,
            min_version: trestle_core::application::services::DEFAULT_MIN_RUNTIME.to_string(),
            timeout_secs: None,
        }
    }
}

impl RuntimeConfig {
    pub fn min_version(&self) -> CliResult<Version> {
        trestle_core::domain::parse_version_loose(&self.min_version).ok_or_else(|| {
            CliError::ConfigError {
                message: format!("runtime.min_version '{}' is not a version", self.min_version),
                source: None,
            }
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateCheckConfig {
    pub enabled: bool,
    /// Package the CLI itself is published as.
    pub package: String,
}

impl Default for UpdateCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            package: "@trestle/cli".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// An explicit `config_file` must exist; the default location is optional.
    pub fn load(config_file: Option<&Path>) -> CliResult<Self> {
        let mut builder = Config::builder();

        match config_file {
            Some(path) => {
                builder = builder.add_source(toml_file(path).required(true));
            }
            None => {
                if let Some(path) = Self::config_path() {
                    builder = builder.add_source(toml_file(&path).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_error)?;

        settings.try_deserialize().map_err(config_error)
    }

    /// Path to the default configuration file, if the platform has one.
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "trestle", "trestle")
            .map(|d| d.config_dir().join("config.toml"))
    }

    /// The CLI home directory.
    ///
    /// Falls back to `~/.trestle`; fails when the user has no usable home.
    pub fn home_dir(&self) -> CliResult<PathBuf> {
        if let Some(home) = &self.home {
            return Ok(home.clone());
        }
        user_home()
            .map(|home| home.join(DEFAULT_HOME_DIR))
            .ok_or_else(|| CliError::EnvironmentError {
                message: "cannot determine the user's home directory".into(),
            })
    }

    /// Builtin bindings overlaid with the configured ones.
    pub fn command_registry(&self) -> CliResult<CommandRegistry> {
        let mut registry = CommandRegistry::builtin();
        for (command, spec) in &self.commands {
            let binding: CommandBinding = spec.parse().map_err(|e| CliError::ConfigError {
                message: format!("commands.{command}: {e}"),
                source: Some(Box::new(e)),
            })?;
            registry.bind(command.clone(), binding);
        }
        Ok(registry)
    }

    /// Local registry root, required when `registry.kind = "local"`.
    pub fn local_registry_path(&self) -> CliResult<&Path> {
        self.registry.path.as_deref().ok_or_else(|| CliError::ConfigError {
            message: "registry.path must be set when registry.kind is \"local\"".into(),
            source: None,
        })
    }
}

/// The user's home directory, only if it actually exists.
pub fn user_home() -> Option<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .filter(|home| home.is_dir())
}

/// A `.env` file that exists but could not be loaded.
#[derive(Debug)]
pub struct DotenvProblem {
    pub path: PathBuf,
    pub error: dotenvy::Error,
}

/// Load `.env` from the working directory, then from the user's home.
///
/// Variables already set are never overridden. Missing files are skipped;
/// unreadable or malformed ones are returned so they can be logged once
/// logging is up.
pub fn load_dotenv() -> Vec<DotenvProblem> {
    let mut candidates = vec![PathBuf::from(".env")];
    if let Some(home) = user_home() {
        candidates.push(home.join(".env"));
    }
    load_dotenv_files(candidates)
}

fn load_dotenv_files(paths: impl IntoIterator<Item = PathBuf>) -> Vec<DotenvProblem> {
    paths
        .into_iter()
        .filter_map(|path| match dotenvy::from_path(&path) {
            Ok(()) => None,
            Err(dotenvy::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => None,
            Err(error) => Some(DotenvProblem { path, error }),
        })
        .collect()
}

fn toml_file(path: &Path) -> File<config::FileSourceFile, FileFormat> {
    File::from(path).format(FileFormat::Toml)
}

fn config_error(e: config::ConfigError) -> CliError {
    CliError::ConfigError {
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_use_npm_and_node() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.registry.kind, RegistryKind::Npm);
        assert_eq!(cfg.registry.url, DEFAULT_REGISTRY_URL);
        assert_eq!(cfg.runtime.kind, RuntimeKind::Node);
        assert_eq!(cfg.runtime.min_version().unwrap(), Version::new(12, 0, 0));
        assert_eq!(cfg.runtime.timeout(), None);
        assert!(!cfg.update_check.enabled);
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(
            r#"
home = "/srv/trestle"

[registry]
kind = "local"
path = "/srv/packages"

[runtime]
kind = "script"
program = "sh"
timeout_secs = 30

[commands]
deploy = "@acme/deploy@^2"
"#,
        );
        let cfg = AppConfig::load(Some(file.path())).unwrap();

        assert_eq!(cfg.home_dir().unwrap(), PathBuf::from("/srv/trestle"));
        assert_eq!(cfg.registry.kind, RegistryKind::Local);
        assert_eq!(cfg.local_registry_path().unwrap(), Path::new("/srv/packages"));
        assert_eq!(cfg.registry.url, DEFAULT_REGISTRY_URL);
        assert_eq!(cfg.runtime.kind, RuntimeKind::Script);
        assert_eq!(cfg.runtime.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.runtime.min_version, "12.0.0");
    }

    #[test]
    fn explicit_missing_file_is_config_error() {
        let err = AppConfig::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, CliError::ConfigError { .. }));
    }

    #[test]
    fn configured_commands_extend_builtin_registry() {
        let mut cfg = AppConfig::default();
        cfg.commands.insert("deploy".into(), "@acme/deploy@^2".into());
        let registry = cfg.command_registry().unwrap();

        assert_eq!(registry.commands().collect::<Vec<_>>(), vec!["deploy", "init"]);
        assert_eq!(registry.get("deploy").unwrap().package.as_str(), "@acme/deploy");
    }

    #[test]
    fn malformed_binding_is_config_error() {
        let mut cfg = AppConfig::default();
        cfg.commands.insert("deploy".into(), "@acme/deploy@not a range".into());
        assert!(matches!(cfg.command_registry(), Err(CliError::ConfigError { .. })));
    }

    #[test]
    fn local_registry_without_path_is_config_error() {
        let mut cfg = AppConfig::default();
        cfg.registry.kind = RegistryKind::Local;
        assert!(cfg.local_registry_path().is_err());
    }

    #[test]
    fn bad_min_version_is_config_error() {
        let mut cfg = AppConfig::default();
        cfg.runtime.min_version = "twelve".into();
        assert!(cfg.runtime.min_version().is_err());
    }

    #[test]
    fn missing_dotenv_files_are_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(load_dotenv_files([dir.path().join(".env")]).is_empty());
    }

    #[test]
    fn malformed_dotenv_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "TRESTLE_DOTENV_UNTERMINATED='oops\n").unwrap();

        let problems = load_dotenv_files([path.clone()]);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].path, path);
        assert!(matches!(problems[0].error, dotenvy::Error::LineParse(..)));
    }
}
