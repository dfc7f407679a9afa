//! Configuration file commands.

use anyhow::{Context, Result};
use hrms_core::{Config, CONFIG_FILE};
use std::path::Path;

/// Writes a default hrms.toml.
pub fn init(root: &Path, force: bool) -> Result<()> {
    let path = root.join(CONFIG_FILE);
    if path.exists() && !force {
        return Err(anyhow::anyhow!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        ));
    }
    Config::default()
        .save(root)
        .context("Failed to write configuration")?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Prints the effective configuration as toml.
pub fn show(root: &Path) -> Result<()> {
    let config = super::load_config(root)?;
    let source = if root.join(CONFIG_FILE).exists() {
        CONFIG_FILE
    } else {
        "defaults"
    };
    println!("# effective configuration ({})", source);
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
