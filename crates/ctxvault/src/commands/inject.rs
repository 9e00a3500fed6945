//! Injection preview and agent hook handlers.
//!
//! Hooks write raw markdown to stdout for the agent to consume and never
//! fail a session: without a vault they print nothing.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use ctxvault_core::vault::ExtractRequest;
use ctxvault_core::Vault;
use tracing::{info, warn};

use super::{open_vault, print_json};
use crate::cli::{HookAction, HookCommand};

pub fn preview(project: &Path, json: bool) -> Result<()> {
    let vault = open_vault(project)?;
    let payload = vault.session_payload()?;

    if json {
        return print_json(&payload);
    }
    if payload.markdown.is_empty() {
        println!("{}", "Nothing to inject (no memories or injection disabled).".dimmed());
        return Ok(());
    }

    println!("{}", "Injection Preview".bold());
    println!("{}", "─".repeat(60).dimmed());
    println!();
    println!("{}", payload.markdown);
    println!();
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "  Memories: {}  |  Tokens: {}/{}",
        payload.notes.len().to_string().bold(),
        payload.token_count.to_string().bold(),
        vault.config().injection.max_tokens
    );
    Ok(())
}

pub fn hook(project: &Path, cmd: HookCommand) -> Result<()> {
    if !Vault::exists(project) {
        return Ok(());
    }
    let vault = open_vault(project)?;

    match cmd.action {
        HookAction::SessionStart => {
            let payload = vault.session_payload()?;
            print!("{}", payload.markdown);
        }
        HookAction::PreEdit { file } => {
            let context = vault.file_context(&file)?;
            print!("{}", context.markdown);
            vault.record_hits(context.notes.iter().map(|n| n.file_path.as_str()))?;
        }
        HookAction::SessionEnd { transcript } => {
            let request = ExtractRequest {
                save: true,
                ..Default::default()
            };
            match vault.extract_file(&transcript, request) {
                Ok(outcome) => info!(
                    "Session end: {} memories saved, {} duplicates",
                    outcome.created_paths.len(),
                    outcome.report.deduplicated
                ),
                Err(e) => warn!("Session-end extraction failed for {}: {}", transcript.display(), e),
            }
        }
    }
    Ok(())
}
