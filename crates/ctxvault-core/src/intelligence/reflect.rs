//! Mining saved session snapshots for new memories.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::extraction::{extract_from_transcript, ExtractOptions};
use crate::index::SearchIndex;
use crate::memory::NoteStore;
use crate::types::CreateNoteInput;

/// Agent label recorded on notes created by reflection.
pub const REFLECT_AGENT: &str = "ctxvault-reflect";

/// Directory (under the vault root) holding session snapshots.
pub const SESSIONS_DIR: &str = "sessions";

/// Only the newest snapshots are read.
pub const MAX_SNAPSHOTS: usize = 10;

/// Options for [`reflect_on_sessions`].
#[derive(Debug, Clone, Default)]
pub struct ReflectOptions {
    /// Report candidates without creating notes
    pub dry_run: bool,
    /// Snapshot directory; defaults to `<vault>/sessions`
    pub sessions_dir: Option<PathBuf>,
}

/// Outcome of a reflection pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReflectReport {
    /// Notes created
    pub created: usize,
    /// Candidates dropped as duplicates
    pub deduplicated: usize,
    /// Snapshot files read
    pub snapshots: usize,
    /// Surviving candidates (created unless this was a dry run)
    pub memories: Vec<CreateNoteInput>,
    /// Paths of the notes created
    pub created_paths: Vec<String>,
}

/// Read the newest `snapshot-*.md` files, extract candidates from their
/// combined text and create a note for each one the index does not
/// already hold.
pub fn reflect_on_sessions(
    store: &NoteStore,
    index: &SearchIndex,
    config: &Config,
    options: ReflectOptions,
) -> Result<ReflectReport> {
    let sessions_dir = options
        .sessions_dir
        .unwrap_or_else(|| store.root().join(SESSIONS_DIR));
    if !sessions_dir.is_dir() {
        debug!("No session snapshots at {}", sessions_dir.display());
        return Ok(ReflectReport::default());
    }

    let mut snapshots: Vec<String> = fs::read_dir(&sessions_dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with("snapshot-") && name.ends_with(".md"))
        .collect();
    snapshots.sort();
    snapshots.reverse();
    snapshots.truncate(MAX_SNAPSHOTS);

    if snapshots.is_empty() {
        return Ok(ReflectReport::default());
    }

    let mut combined = String::new();
    for name in &snapshots {
        combined.push_str(&fs::read_to_string(sessions_dir.join(name))?);
        combined.push_str("\n\n");
    }

    let extraction = extract_from_transcript(
        &combined,
        &config.extract,
        ExtractOptions {
            source_agent: Some(REFLECT_AGENT.to_string()),
            index: Some(index),
            ..Default::default()
        },
    );

    let mut report = ReflectReport {
        deduplicated: extraction.deduplicated,
        snapshots: snapshots.len(),
        ..Default::default()
    };

    for input in extraction.memories {
        if !options.dry_run {
            let note = store.create(input.clone())?;
            index.sync(&note)?;
            report.created += 1;
            report.created_paths.push(note.file_path);
        }
        report.memories.push(input);
    }

    info!(
        "Reflected on {} snapshots: {} created, {} duplicates",
        report.snapshots, report.created, report.deduplicated
    );
    Ok(report)
}
