//! `trestle cache`: inspect and clear cached package versions.

use serde_json::json;

use trestle_core::domain::PackageName;

use crate::{
    cli::CacheCommands,
    commands::Services,
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
};

/// Dispatch to the correct cache subcommand.
pub fn execute(cmd: CacheCommands, config: &AppConfig, output: &OutputManager) -> CliResult<()> {
    let services = Services::from_config(config)?;
    let cache = services.cache();
    let store_dir = &services.layout.store_dir;

    match cmd {
        CacheCommands::List => {
            let entries = cache.entries(store_dir)?;
            if output.is_json() {
                let rendered: Vec<_> = entries
                    .iter()
                    .map(|e| {
                        json!({
                            "package": e.name.as_str(),
                            "version": e.version.to_string(),
                            "path": e.path.display().to_string(),
                        })
                    })
                    .collect();
                output.json(&rendered)?;
                return Ok(());
            }
            if entries.is_empty() {
                output.print(&format!("Cache at {} is empty", store_dir.display()))?;
                return Ok(());
            }
            output.header(&format!("Cached packages ({}):", store_dir.display()))?;
            for e in &entries {
                let path = output.detail(&e.path.display().to_string());
                output.print(&format!("  {}@{}  {}", e.name, e.version, path))?;
            }
        }

        CacheCommands::Clean { package } => {
            let name = package
                .as_deref()
                .map(PackageName::new)
                .transpose()
                .map_err(|e| CliError::Core(e.into()))?;
            let removed = cache.remove(store_dir, name.as_ref())?;
            if output.is_json() {
                let rendered: Vec<_> =
                    removed.iter().map(|e| format!("{}@{}", e.name, e.version)).collect();
                output.json(&rendered)?;
                return Ok(());
            }
            match removed.len() {
                0 => output.print("Nothing to remove")?,
                n => output.success(&format!("Removed {n} cached version(s)"))?,
            }
        }
    }

    Ok(())
}
