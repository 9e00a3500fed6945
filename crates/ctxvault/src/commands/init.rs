//! Vault initialization.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use ctxvault_core::config::CONFIG_FILE;
use ctxvault_core::Vault;

pub fn execute(project: &Path, force: bool) -> Result<()> {
    if !force && Vault::dir(project).join(CONFIG_FILE).exists() {
        println!(
            "{}",
            "ctxvault is already initialized. Use --force to reset the config.".yellow()
        );
        return Ok(());
    }

    let vault = Vault::init(project, force)
        .with_context(|| format!("Failed to initialize vault in {}", project.display()))?;
    let indexed = vault.rebuild().context("Failed to build the search index")?;

    println!("{} Vault ready at {}", "✓".green(), vault.root().display());
    println!("  Config: {}", vault.root().join(CONFIG_FILE).display().to_string().dimmed());
    if indexed > 0 {
        println!("  Indexed {} existing memories", indexed);
    } else {
        println!("  {}", "No memories yet. Start with `ctx add`.".dimmed());
    }
    Ok(())
}
