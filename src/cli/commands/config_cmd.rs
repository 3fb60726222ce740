//! Configuration management commands.

use console::style;

use crate::config::Settings;

/// Print the effective configuration as TOML.
pub fn cmd_config_show(settings: &Settings) -> anyhow::Result<()> {
    match &settings.source_path {
        Some(path) => eprintln!("{}", style(format!("# Loaded from {}", path.display())).dim()),
        None => eprintln!("{}", style("# No config file; defaults and environment only").dim()),
    }
    print!("{}", settings.to_toml_redacted()?);
    Ok(())
}
