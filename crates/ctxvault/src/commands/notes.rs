//! Note commands: add, show, edit, remove, list.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use ctxvault_core::time::format_datetime;
use ctxvault_core::{CreateNoteInput, ListOptions, MemoryType, Note, SortBy, UpdateNoteInput};

use super::{open_vault, print_json};
use crate::cli::{AddArgs, EditArgs};

pub fn add(project: &Path, args: AddArgs) -> Result<()> {
    let vault = open_vault(project)?;

    let content = args.content.unwrap_or_else(|| args.summary.clone());
    let input = CreateNoteInput::new(args.r#type, args.summary, content)
        .with_tags(trimmed(args.tags))
        .with_related_files(trimmed(args.related))
        .with_source(args.agent, args.session);

    let note = vault.add(input).context("Failed to create memory")?;
    println!("{} Memory created: {}", "✓".green(), note.file_path);
    Ok(())
}

pub fn show(project: &Path, path: &str, json: bool) -> Result<()> {
    let vault = open_vault(project)?;
    let Some(note) = vault.show(path)? else {
        bail!("Not found: {}", path);
    };

    if json {
        return print_json(&note);
    }

    println!("{}", format!("{}: {}", note.memory_type, note.summary).bold());
    println!("{}", "─".repeat(60).dimmed());
    println!();
    println!("{}", note.content);
    println!();
    println!("{}", "─".repeat(60).dimmed());
    println!("  Type:      {}", note.memory_type.as_str().cyan());
    if note.tags.is_empty() {
        println!("  Tags:      {}", "none".dimmed());
    } else {
        println!("  Tags:      {}", note.tags.join(", "));
    }
    println!("  Relevance: {:.2}", note.relevance);
    println!("  Created:   {}", format_datetime(&note.created_at));
    println!("  Updated:   {}", format_datetime(&note.updated_at));
    if !note.related_files.is_empty() {
        println!("  Related:   {}", note.related_files.join(", "));
    }
    if note.access_count > 0 {
        let last = note.last_accessed.as_ref().map(format_datetime).unwrap_or_default();
        println!("  Accessed:  {} times (last {})", note.access_count, last);
    }
    Ok(())
}

/// Apply the given field changes, or open the file in `$EDITOR` when no
/// field was given. Either way the index is refreshed afterwards.
pub fn edit(project: &Path, args: EditArgs) -> Result<()> {
    let vault = open_vault(project)?;
    let changes = UpdateNoteInput {
        summary: args.summary,
        content: args.content,
        tags: args.tags.map(trimmed),
        related_files: args.related.map(trimmed),
        relevance: args.relevance,
    };

    if !changes.is_empty() {
        if vault.edit(&args.path, changes)?.is_none() {
            bail!("Not found: {}", args.path);
        }
        println!("{} Updated: {}", "✓".green(), args.path);
        return Ok(());
    }

    if vault.show(&args.path)?.is_none() {
        bail!("Not found: {}", args.path);
    }
    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| "vi".to_string());
    let status = Command::new(&editor)
        .arg(vault.root().join(&args.path))
        .status()
        .with_context(|| format!("Failed to launch editor '{}'", editor))?;
    if !status.success() {
        bail!("Editor exited with {}", status);
    }

    vault
        .resync(&args.path)
        .with_context(|| format!("Failed to re-index {}", args.path))?;
    println!("{} Synced: {}", "✓".green(), args.path);
    Ok(())
}

pub fn remove(project: &Path, path: &str) -> Result<()> {
    let vault = open_vault(project)?;
    if !vault.remove(path)? {
        bail!("Not found: {}", path);
    }
    println!("{} Removed: {}", "✓".green(), path);
    Ok(())
}

pub fn list(
    project: &Path,
    memory_type: Option<MemoryType>,
    sort_by: SortBy,
    limit: usize,
    json: bool,
) -> Result<()> {
    let vault = open_vault(project)?;
    let notes = vault.list(&ListOptions {
        memory_type,
        sort_by,
        limit: Some(limit),
    })?;

    if json {
        return print_json(&notes);
    }
    if notes.is_empty() {
        println!("{}", "No memories found.".dimmed());
        return Ok(());
    }

    for note in &notes {
        print_note_line(note);
    }
    println!("{}", format!("\n{} entries", notes.len()).dimmed());
    Ok(())
}

/// `type  summary [tags]` followed by the dimmed path.
fn print_note_line(note: &Note) {
    let tags = if note.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", note.tags.join(", ")).dimmed().to_string()
    };
    println!(
        "{} {}{}",
        format!("{:<11}", note.memory_type.as_str()).cyan(),
        note.summary.bold(),
        tags
    );
    println!("  {}", note.file_path.dimmed());
}

fn trimmed(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
