//! Index and relevance maintenance: sync, decay, boost, deprecate, defrag.

use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use super::{dry_run_banner, heading, open_vault, print_json};
use crate::cli::DryRunArgs;

pub fn sync(project: &Path) -> Result<()> {
    let vault = open_vault(project)?;
    let count = vault.rebuild().context("Failed to rebuild index")?;
    println!("{} Index rebuilt: {} memories indexed", "✓".green(), count);
    Ok(())
}

pub fn decay(project: &Path, args: DryRunArgs) -> Result<()> {
    let vault = open_vault(project)?;
    let report = vault.decay(args.dry_run)?;

    if args.json {
        return print_json(&report);
    }

    dry_run_banner(args.dry_run);
    heading("Decay results");
    println!("  Updated:         {}", report.updated);
    println!("  Low relevance:   {}", report.archived.len());
    println!("  Suggest delete:  {}", report.suggest_delete.len());

    if !report.archived.is_empty() {
        println!("{}", "\nLow relevance (below archive threshold):".yellow());
        for path in &report.archived {
            println!("  {}", path.dimmed());
        }
    }
    if !report.suggest_delete.is_empty() {
        println!("{}", "\nSuggested for deletion (very low relevance and old):".red());
        for path in &report.suggest_delete {
            println!("  {}", path.dimmed());
        }
    }
    Ok(())
}

pub fn boost(project: &Path, path: &str, amount: f64) -> Result<()> {
    let vault = open_vault(project)?;
    let before = vault.index().get_by_path(path)?.map(|n| n.relevance);
    let Some(after) = vault.boost(path, amount)? else {
        bail!("Not indexed: {} (run `ctx sync`?)", path);
    };
    print_change(path, before, after);
    Ok(())
}

pub fn deprecate(project: &Path, path: &str) -> Result<()> {
    let vault = open_vault(project)?;
    let before = vault.index().get_by_path(path)?.map(|n| n.relevance);
    let Some(after) = vault.deprecate(path)? else {
        bail!("Not indexed: {} (run `ctx sync`?)", path);
    };
    println!("{} Deprecated: {}", "✓".green(), path);
    print_change(path, before, after);
    Ok(())
}

pub fn defrag(project: &Path, args: DryRunArgs) -> Result<()> {
    let vault = open_vault(project)?;
    let report = vault.defrag(args.dry_run)?;

    if args.json {
        return print_json(&report);
    }

    dry_run_banner(args.dry_run);
    heading("Defrag results");
    println!("  Merged duplicates: {}", report.merged);
    println!("  Low relevance:     {}", report.archived.len());
    println!("  Total memories:    {}", report.total_memories);

    if !report.merged_paths.is_empty() {
        let label = if args.dry_run { "\nWould merge away:" } else { "\nMerged away:" };
        println!("{}", label.cyan());
        for path in &report.merged_paths {
            println!("  {}", path.dimmed());
        }
    }
    if !report.archived.is_empty() {
        println!("{}", "\nLow relevance memories:".yellow());
        for path in &report.archived {
            println!("  {}", path.dimmed());
        }
    }
    Ok(())
}

fn print_change(path: &str, before: Option<f64>, after: f64) {
    match before {
        Some(before) => println!("  {}: {:.2} → {:.2}", path, before, after),
        None => println!("  {}: {:.2}", path, after),
    }
}
