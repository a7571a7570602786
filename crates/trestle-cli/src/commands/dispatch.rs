//! `trestle init` and every config-bound command: run a package.
//!
//! The invocation handed to the lifecycle is `[positional..., options]`,
//! the same shape for the builtin `init` and for external commands whose
//! trailing words are split by [`parse_trailing_args`].

use std::sync::Arc;

use semver::Version;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use trestle_core::{
    application::{
        ApplicationError, DispatchCommand, DispatchOverrides, Lifecycle, SelfUpdateCheck,
        ports::PackageManager,
    },
    domain::{PackageName, VersionRequest, parse_trailing_args, registry::INIT_COMMAND},
};

use crate::{
    cli::{GlobalArgs, InitArgs},
    commands::{Services, current_dir},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// `trestle init [PROJECT_NAME] [--force]`.
pub fn execute_init(
    args: InitArgs,
    global: &GlobalArgs,
    config: &AppConfig,
    output: &OutputManager,
) -> CliResult<()> {
    run(INIT_COMMAND, init_invocation(args), global, config, output)
}

/// `trestle <command> [words...]` for a command bound in configuration.
pub fn execute_external(
    words: Vec<String>,
    global: &GlobalArgs,
    config: &AppConfig,
    output: &OutputManager,
) -> CliResult<()> {
    let Some((command, rest)) = words.split_first() else {
        return Err(CliError::InvalidInput {
            message: "no command given".into(),
            source: None,
        });
    };
    run(command, external_invocation(rest), global, config, output)
}

#[instrument(skip_all, fields(command = %command))]
fn run(
    command: &str,
    invocation: Vec<Value>,
    global: &GlobalArgs,
    config: &AppConfig,
    output: &OutputManager,
) -> CliResult<()> {
    let services = Services::from_config(config)?;

    // Unknown names fail before the runtime is probed or anything is touched.
    if services.registry.get(command).is_none() {
        return Err(CliError::Core(
            ApplicationError::UnknownCommand {
                name: command.to_string(),
                available: services.registry.commands().map(str::to_string).collect(),
            }
            .into(),
        ));
    }

    if let Some(notice) = root_notice(effective_uid()) {
        let _ = output.warning(&notice);
    }

    let overrides = overrides(global)?;
    if config.update_check.enabled {
        check_for_update(services.manager.clone(), &config.update_check.package, output);
    }

    let dispatcher = services.dispatcher(config)?;
    let lifecycle =
        Lifecycle::new(services.launcher.clone()).with_min_version(config.runtime.min_version()?);
    let outcome =
        lifecycle.run(DispatchCommand::new(&dispatcher, command, overrides), invocation)?;

    let package = &outcome.package;
    match &outcome.version {
        Some(version) => info!(%package, %version, "Command completed"),
        None => info!(%package, entry = %outcome.entry.display(), "Command completed"),
    }
    Ok(())
}

fn init_invocation(args: InitArgs) -> Vec<Value> {
    let mut options = Map::new();
    if args.force {
        options.insert("force".into(), Value::Bool(true));
    }
    let mut invocation: Vec<Value> = args.project_name.into_iter().map(Value::String).collect();
    invocation.push(Value::Object(options));
    invocation
}

fn external_invocation(words: &[String]) -> Vec<Value> {
    let (mut invocation, options) = parse_trailing_args(words);
    invocation.push(Value::Object(options));
    invocation
}

/// Relative target paths are taken from the current directory.
fn overrides(global: &GlobalArgs) -> CliResult<DispatchOverrides> {
    let target_path = match &global.target_path {
        Some(path) if path.is_relative() => Some(current_dir()?.join(path)),
        other => other.clone(),
    };
    let version = global
        .package_version
        .as_deref()
        .map(str::parse::<VersionRequest>)
        .transpose()
        .map_err(|e| CliError::Core(e.into()))?;
    Ok(DispatchOverrides { target_path, version })
}

#[cfg(unix)]
fn effective_uid() -> Option<u32> {
    // SAFETY: geteuid has no preconditions and cannot fail.
    Some(unsafe { libc::geteuid() })
}

#[cfg(not(unix))]
fn effective_uid() -> Option<u32> {
    None
}

/// Cache directories created by root are not writable by later user runs.
fn root_notice(euid: Option<u32>) -> Option<String> {
    (euid == Some(0)).then(|| {
        "Running as root: packages cached now will be owned by root. \
         Run trestle as a regular user."
            .to_string()
    })
}

/// Warn about a newer compatible CLI release. Never fails the run.
fn check_for_update(manager: Arc<dyn PackageManager>, package: &str, output: &OutputManager) {
    let outcome = PackageName::new(package)
        .map_err(|e| CliError::Core(e.into()))
        .and_then(|name| {
            let current = Version::parse(trestle_core::VERSION).map_err(|e| CliError::InvalidInput {
                message: format!("own version '{}' is not semver", trestle_core::VERSION),
                source: Some(Box::new(e)),
            })?;
            Ok(SelfUpdateCheck::new(manager, name).check(&current)?)
        });

    match outcome {
        Ok(Some(notice)) => {
            let _ = output.warning(&format!(
                "A newer version of {} is available: {} \u{2192} {}",
                notice.package, notice.current, notice.latest
            ));
        }
        Ok(None) => {}
        Err(e) => debug!(error = %e, "Self-update check failed"),
    }
}
