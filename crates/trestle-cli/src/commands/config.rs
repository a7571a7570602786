//! `trestle config`: read configuration values.

use std::path::Path;

use serde_json::Value;

use crate::{
    cli::ConfigCommands,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Dispatch to the correct config subcommand.
pub fn execute(
    cmd: ConfigCommands,
    config: &AppConfig,
    config_file: Option<&Path>,
    output: &OutputManager,
) -> CliResult<()> {
    match cmd {
        ConfigCommands::Get { key } => {
            let value = get_config_value(config, &key)?;
            output.print(&value)?;
        }

        ConfigCommands::List => {
            let serialised = toml::to_string_pretty(config).map_err(|e| CliError::ConfigError {
                message: format!("Failed to serialise config: {e}"),
                source: Some(Box::new(e)),
            })?;
            output.print(serialised.trim_end())?;
        }

        ConfigCommands::Path => {
            let path = config_file
                .map(Path::to_path_buf)
                .or_else(AppConfig::config_path)
                .ok_or_else(|| CliError::EnvironmentError {
                    message: "this platform has no configuration directory".into(),
                })?;
            output.print(&path.display().to_string())?;
        }
    }

    Ok(())
}

// ── helpers ───────────────────────────────────────────────────────────────────

/// Look up a dotted key such as `registry.url` or `commands.deploy`.
///
/// `home` reports the effective home, default included.
fn get_config_value(config: &AppConfig, key: &str) -> CliResult<String> {
    if key == "home" {
        return Ok(config.home_dir()?.display().to_string());
    }

    let tree = serde_json::to_value(config).map_err(|e| CliError::ConfigError {
        message: format!("Failed to serialise config: {e}"),
        source: Some(Box::new(e)),
    })?;
    let unknown = || CliError::ConfigError {
        message: format!("Unknown config key: '{key}'"),
        source: None,
    };

    let mut node = &tree;
    for segment in key.split('.') {
        node = node.get(segment).ok_or_else(unknown)?;
    }

    match node {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Object(_) => Err(CliError::ConfigError {
            message: format!("'{key}' is a table; use 'trestle config list'"),
            source: None,
        }),
        other => Ok(other.to_string()),
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn get_known_key() {
        let cfg = AppConfig::default();
        assert_eq!(get_config_value(&cfg, "registry.kind").unwrap(), "npm");
        assert_eq!(get_config_value(&cfg, "runtime.min_version").unwrap(), "12.0.0");
    }

    #[test]
    fn get_unknown_key_is_error() {
        let cfg = AppConfig::default();
        assert!(matches!(
            get_config_value(&cfg, "does.not.exist"),
            Err(CliError::ConfigError { .. })
        ));
    }

    #[test]
    fn get_unset_optional_is_empty() {
        let cfg = AppConfig::default();
        assert_eq!(get_config_value(&cfg, "runtime.timeout_secs").unwrap(), "");
    }

    #[test]
    fn get_bool_and_binding() {
        let mut cfg = AppConfig::default();
        cfg.commands.insert("deploy".into(), "@acme/deploy@^2".into());
        assert_eq!(get_config_value(&cfg, "output.no_color").unwrap(), "false");
        assert_eq!(get_config_value(&cfg, "commands.deploy").unwrap(), "@acme/deploy@^2");
    }

    #[test]
    fn get_table_is_error() {
        let cfg = AppConfig::default();
        assert!(get_config_value(&cfg, "registry").is_err());
    }

    #[test]
    fn get_home_reports_configured_value() {
        let mut cfg = AppConfig::default();
        cfg.home = Some(PathBuf::from("/srv/trestle"));
        assert_eq!(get_config_value(&cfg, "home").unwrap(), "/srv/trestle");
    }
}
