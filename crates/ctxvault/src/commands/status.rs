//! Vault status and configuration commands.
//!
//! Supports JSON output for programmatic use.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use ctxvault_core::vault::VaultStatus;
use ctxvault_core::Config;

use super::{heading, open_vault, print_json};
use crate::cli::{ConfigAction, ConfigCommand};

pub fn execute(project: &Path, json: bool) -> Result<()> {
    let vault = open_vault(project)?;
    let status = vault.status()?;

    if json {
        return print_json(&status);
    }
    print_dashboard(&status);
    Ok(())
}

fn print_dashboard(status: &VaultStatus) {
    heading("ctxvault Status");
    println!("  Vault:          {}", status.root.display());
    match &status.config_file {
        Some(path) => println!("  Config:         {}", path.display()),
        None => println!("  Config:         {}", "defaults (no config.toml)".yellow()),
    }
    println!("  Total memories: {}", status.total.to_string().bold());
    println!();

    for (memory_type, count) in &status.by_type {
        if *count > 0 {
            println!("  {} {}", format!("{:<12}", memory_type.as_str()).cyan(), count);
        }
    }
    if status.total == 0 {
        println!("  {}", "No memories yet. Start adding with `ctx add`.".dimmed());
    }

    println!();
    if status.in_sync() {
        println!("  Index: {} ({} rows)", "✓ in sync".green(), status.indexed);
        return;
    }
    println!(
        "  Index: {} ({} rows, run `ctx sync`)",
        "✗ out of sync".yellow(),
        status.indexed
    );
    for path in &status.missing_from_index {
        println!("    {} {}", "+".green(), path.dimmed());
    }
    for path in &status.stale_in_index {
        println!("    {} {}", "-".red(), path.dimmed());
    }
}

pub fn config(project: &Path, cmd: ConfigCommand) -> Result<()> {
    match cmd.action {
        ConfigAction::Show => {
            let config = Config::load(project)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path(project).display());
        }
    }
    Ok(())
}
