//! `trestle list`: bound commands and the versions already cached for them.

use serde_json::json;

use trestle_core::application::CachedEntry;
use trestle_core::domain::CommandBinding;

use crate::{
    commands::Services,
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

pub fn execute(config: &AppConfig, output: &OutputManager) -> CliResult<()> {
    let services = Services::from_config(config)?;
    let cached = services.cache().entries(&services.layout.store_dir)?;

    if output.is_json() {
        let commands: Vec<_> = services
            .registry
            .iter()
            .map(|(command, binding)| {
                json!({
                    "command": command,
                    "package": binding.package.as_str(),
                    "version": binding.version.to_string(),
                    "cached": cached_versions(&cached, binding),
                })
            })
            .collect();
        output.json(&commands)?;
        return Ok(());
    }

    output.header("Commands:")?;
    for (command, binding) in services.registry.iter() {
        let versions = cached_versions(&cached, binding);
        let cached_note = if versions.is_empty() {
            "not cached".to_string()
        } else {
            format!("cached: {}", versions.join(", "))
        };
        output.print(&format!(
            "  {command:<12} {binding}  {}",
            output.detail(&format!("({cached_note})"))
        ))?;
    }
    Ok(())
}

fn cached_versions(cached: &[CachedEntry], binding: &CommandBinding) -> Vec<String> {
    cached
        .iter()
        .filter(|entry| entry.name == binding.package)
        .map(|entry| entry.version.to_string())
        .collect()
}
