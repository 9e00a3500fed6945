//! Command implementations for the ctx CLI.
//!
//! Each submodule implements the logic for a command group.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use ctxvault_core::Vault;
use serde::Serialize;

pub mod extract;
pub mod init;
pub mod inject;
pub mod lifecycle;
pub mod notes;
pub mod search;
pub mod status;

/// Open the project's vault.
pub(crate) fn open_vault(project: &Path) -> Result<Vault> {
    Vault::open(project).with_context(|| format!("Failed to open vault in {}", project.display()))
}

/// Pretty-print a value as JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Section heading with a rule underneath.
pub(crate) fn heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "─".repeat(40).dimmed());
}

pub(crate) fn dry_run_banner(dry_run: bool) {
    if dry_run {
        println!("{}", "Dry run - no changes will be made.\n".dimmed());
    }
}
