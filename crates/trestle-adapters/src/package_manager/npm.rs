//! Package manager backed by the `npm` executable.

use std::path::Path;
use std::process::{Output, Stdio};

use semver::Version;
use serde_json::Value;
use tracing::{debug, instrument};

use trestle_core::{
    application::{ApplicationError, ports::PackageManager},
    domain::PackageName,
    error::TrestleResult,
};

use crate::process::platform_command;

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Shells out to `npm` for version listing and installs.
#[derive(Debug, Clone)]
pub struct NpmCli {
    program: String,
    registry: String,
}

impl NpmCli {
    pub fn new(registry: impl Into<String>) -> Self {
        Self {
            program: "npm".into(),
            registry: registry.into(),
        }
    }

    /// Use a different npm-compatible executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    fn run(&self, args: &[&str]) -> std::io::Result<Output> {
        debug!(program = %self.program, ?args, "Running package manager");
        platform_command(&self.program, args)
            .arg("--registry")
            .arg(&self.registry)
            .stdin(Stdio::null())
            .output()
    }
}

impl Default for NpmCli {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_URL)
    }
}

impl PackageManager for NpmCli {
    #[instrument(skip_all, fields(package = %name))]
    fn list_versions(&self, name: &PackageName) -> TrestleResult<Vec<String>> {
        let registry_error = |reason: String| ApplicationError::Registry {
            package: name.to_string(),
            reason,
        };

        let output = self
            .run(&["view", name.as_str(), "versions", "--json"])
            .map_err(|e| registry_error(format!("cannot run {}: {e}", self.program)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_not_found(&stdout) || is_not_found(&stderr) {
                debug!("Package not published");
                return Ok(Vec::new());
            }
            return Err(registry_error(stderr.trim().to_string()).into());
        }

        parse_versions(&stdout).map_err(|reason| registry_error(reason).into())
    }

    #[instrument(skip_all, fields(package = %name, version = %version))]
    fn fetch(
        &self,
        name: &PackageName,
        version: &Version,
        destination: &Path,
    ) -> TrestleResult<()> {
        let install_error = |reason: String| ApplicationError::Install {
            package: name.to_string(),
            version: version.clone(),
            reason,
        };

        let spec = format!("{name}@{version}");
        let prefix = destination.to_string_lossy();
        let output = self
            .run(&[
                "install",
                "--prefix",
                &prefix,
                "--no-save",
                "--no-package-lock",
                "--no-audit",
                "--no-fund",
                &spec,
            ])
            .map_err(|e| install_error(format!("cannot run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(install_error(stderr.trim().to_string()).into());
        }
        Ok(())
    }
}

fn is_not_found(text: &str) -> bool {
    text.contains("E404")
}

/// `npm view <pkg> versions --json` prints an array, a bare string when
/// exactly one version exists, or nothing at all.
fn parse_versions(stdout: &str) -> Result<Vec<String>, String> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Value =
        serde_json::from_str(trimmed).map_err(|e| format!("unexpected npm output: {e}"))?;
    match parsed {
        Value::String(single) => Ok(vec![single]),
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()),
        other => Err(format!("unexpected npm output: {other}")),
    }
}
