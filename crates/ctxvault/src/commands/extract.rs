//! Memory extraction from transcripts and session snapshots.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use ctxvault_core::vault::{ExtractOutcome, ExtractRequest};

use super::{dry_run_banner, heading, open_vault, print_json};
use crate::cli::{DryRunArgs, ExtractArgs};

pub fn execute(project: &Path, args: ExtractArgs) -> Result<()> {
    let vault = open_vault(project)?;
    let request = ExtractRequest {
        source_agent: args.agent,
        source_session: args.session,
        message_count: None,
        save: args.save,
    };

    let outcome = match &args.file {
        Some(file) => vault
            .extract_file(file, request)
            .with_context(|| format!("Failed to extract from {}", file.display()))?,
        None => {
            let mut transcript = String::new();
            std::io::stdin()
                .read_to_string(&mut transcript)
                .context("Failed to read transcript from stdin")?;
            vault.extract(&transcript, request)?
        }
    };

    if args.json {
        return print_json(&outcome);
    }
    print_outcome(&outcome, args.save);
    Ok(())
}

pub fn reflect(project: &Path, args: DryRunArgs) -> Result<()> {
    let vault = open_vault(project)?;
    let report = vault.reflect(args.dry_run)?;

    if args.json {
        return print_json(&report);
    }

    dry_run_banner(args.dry_run);
    heading("Reflect results");
    println!("  Snapshots read: {}", report.snapshots);
    println!("  Created:        {}", report.created);
    println!("  Deduplicated:   {}", report.deduplicated);

    if report.memories.is_empty() {
        println!("{}", "\nNo new memories found in session snapshots.".dimmed());
    } else {
        println!("{}", "\nExtracted memories:".cyan());
        for memory in &report.memories {
            println!("  {} - {}", memory.memory_type.as_str().bold(), memory.summary);
        }
    }
    Ok(())
}

fn print_outcome(outcome: &ExtractOutcome, saved: bool) {
    let report = &outcome.report;
    heading("Extraction results");
    println!("  Extractor:     {}", outcome.extractor);
    println!("  Candidates:    {}", report.raw.len());
    println!("  Deduplicated:  {}", report.deduplicated);
    println!("  New:           {}", report.memories.len());

    if saved {
        for path in &outcome.created_paths {
            println!("  {} {}", "✓".green(), path);
        }
    } else {
        for memory in &report.memories {
            println!("  {} - {}", memory.memory_type.as_str().bold(), memory.summary);
        }
        if !report.memories.is_empty() {
            println!("{}", "\nRun again with --save to create these memories.".dimmed());
        }
    }
}
