//! Per-file context, looked up before an agent touches a file.

use serde::Serialize;

use crate::config::ContextualConfig;
use crate::error::Result;
use crate::index::SearchIndex;
use crate::types::Note;

use super::budget::render_within_budget;

/// Related notes considered for a single file.
pub const FILE_CONTEXT_LIMIT: usize = 10;

/// Memories relevant to one project file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileContext {
    pub file_path: String,
    pub notes: Vec<Note>,
    pub markdown: String,
    pub token_count: usize,
}

impl FileContext {
    fn empty(file_path: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
            ..Default::default()
        }
    }
}

/// Render one note as a summary bullet.
pub fn format_file_note(note: &Note) -> String {
    format!("- **{}**: {}", note.memory_type, note.summary)
}

/// Bullets for the notes linked to `file_path`, most relevant first, cut to
/// the contextual token ceiling.
pub fn context_for_file(index: &SearchIndex, config: &ContextualConfig, file_path: &str) -> Result<FileContext> {
    if !config.enabled {
        return Ok(FileContext::empty(file_path));
    }

    let hits = index.find_by_related_file(file_path, &config.types, FILE_CONTEXT_LIMIT)?;
    if hits.is_empty() {
        return Ok(FileContext::empty(file_path));
    }

    let blocks: Vec<String> = hits.iter().map(|hit| format_file_note(&hit.note)).collect();
    let header = format!("**Relevant memories for `{}`:**\n", file_path);
    let rendered = render_within_budget(&header, &blocks, "\n", config.max_tokens)?;

    Ok(FileContext {
        file_path: file_path.to_string(),
        notes: hits.into_iter().take(rendered.count).map(|hit| hit.note).collect(),
        markdown: rendered.markdown,
        token_count: rendered.token_count,
    })
}
