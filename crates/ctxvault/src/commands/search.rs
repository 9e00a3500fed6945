//! Full-text search.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use ctxvault_core::index::SearchOptions;
use ctxvault_core::MemoryType;

use super::{open_vault, print_json};

pub fn execute(
    project: &Path,
    query: &str,
    memory_type: Option<MemoryType>,
    limit: usize,
    touch: bool,
    json: bool,
) -> Result<()> {
    let vault = open_vault(project)?;
    let hits = vault.search(query, &SearchOptions { memory_type, limit })?;

    if touch {
        vault.record_hits(hits.iter().map(|hit| hit.note.file_path.as_str()))?;
    }

    if json {
        return print_json(&hits);
    }
    if hits.is_empty() {
        println!("{}", "No results found.".dimmed());
        return Ok(());
    }

    for hit in &hits {
        println!(
            "{} {} {}",
            format!("{:<11}", hit.note.memory_type.as_str()).cyan(),
            hit.note.summary.bold(),
            format!("({:.2})", hit.rank).dimmed()
        );
        println!("  {}", hit.note.file_path.dimmed());
    }
    println!("{}", format!("\n{} results", hits.len()).dimmed());
    Ok(())
}
