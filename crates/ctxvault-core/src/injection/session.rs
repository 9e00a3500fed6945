//! Session-start payload.

use serde::Serialize;
use tracing::debug;

use crate::config::InjectionConfig;
use crate::error::Result;
use crate::memory::NoteStore;
use crate::types::{ListOptions, MemoryType, Note, SortBy};

use super::budget::render_within_budget;

/// Heading that opens a session payload.
pub const SESSION_HEADER: &str = "## Project Memory (CtxVault)\n\n";

const SESSION_SEPARATOR: &str = "\n\n";

/// Markdown handed to an agent when a session starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Payload {
    /// Rendered markdown; empty when nothing fits
    pub markdown: String,
    /// Notes included, in rendered order
    pub notes: Vec<Note>,
    /// Tokens in `markdown`
    pub token_count: usize,
}

/// Render one note as a payload block.
pub fn format_session_note(note: &Note) -> String {
    let tags = if note.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", note.tags.join(", "))
    };
    format!("### {}: {}{}\n{}", note.memory_type, note.summary, tags, note.content)
}

/// Build the session payload from the store, most relevant notes first.
///
/// Notes of excluded types or carrying an excluded tag are skipped. With
/// `always_include_system`, conventions lead.
pub fn build_session_payload(store: &NoteStore, config: &InjectionConfig) -> Result<Payload> {
    if !config.enabled {
        return Ok(Payload::default());
    }

    let notes = store.list(&ListOptions {
        sort_by: SortBy::Relevance,
        ..Default::default()
    })?;

    let eligible = notes.into_iter().filter(|note| {
        config.include_types.contains(&note.memory_type)
            && !note.tags.iter().any(|tag| config.exclude_tags.contains(tag))
    });

    let (mut ordered, rest): (Vec<Note>, Vec<Note>) = eligible
        .partition(|note| config.always_include_system && note.memory_type == MemoryType::Convention);
    ordered.extend(rest);

    let blocks: Vec<String> = ordered.iter().map(format_session_note).collect();
    let rendered = render_within_budget(SESSION_HEADER, &blocks, SESSION_SEPARATOR, config.max_tokens)?;

    ordered.truncate(rendered.count);
    debug!(
        "Session payload: {} of {} notes, {} tokens",
        rendered.count,
        blocks.len(),
        rendered.token_count
    );
    Ok(Payload {
        markdown: rendered.markdown,
        notes: ordered,
        token_count: rendered.token_count,
    })
}
