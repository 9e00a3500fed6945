//! Note file codec.
//!
//! A note file is a TOML metadata block fenced by `+++` lines followed by
//! the free-text body:
//!
//! ```text
//! +++
//! id = "01923c5e-..."
//! type = "gotcha"
//! summary = "ESM requires .js extensions"
//! tags = ["esm"]
//! relevance = 1.0
//! created = "2026-01-02T03:04:05.678Z"
//! updated = "2026-01-02T03:04:05.678Z"
//! +++
//!
//! TypeScript ESM projects must use .js in relative imports.
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::time::{format_datetime, parse_datetime};
use crate::types::{clamp_relevance, MemoryType, Note};

const DELIMITER: &str = "+++";

/// On-disk metadata block. Field order here is the order written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Frontmatter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    id: String,
    #[serde(rename = "type")]
    memory_type: MemoryType,
    summary: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_relevance")]
    relevance: f64,
    created: String,
    updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_session: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    related_files: Vec<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    access_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_accessed: Option<String>,
}

fn default_relevance() -> f64 {
    1.0
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Serialize a note into its file representation.
pub fn serialize_note(note: &Note) -> Result<String> {
    let frontmatter = Frontmatter {
        id: note.id.clone(),
        memory_type: note.memory_type,
        summary: note.summary.clone(),
        tags: note.tags.clone(),
        relevance: note.relevance,
        created: format_datetime(&note.created_at),
        updated: format_datetime(&note.updated_at),
        source_agent: note.source_agent.clone(),
        source_session: note.source_session.clone(),
        related_files: note.related_files.clone(),
        access_count: note.access_count,
        last_accessed: note.last_accessed.as_ref().map(format_datetime),
    };

    let meta = toml::to_string(&frontmatter)?;
    Ok(format!("{DELIMITER}\n{meta}{DELIMITER}\n\n{}\n", note.content))
}

/// Parse a note file. `file_path` is the vault-relative location the text
/// was read from; it is not stored inside the file.
pub fn parse_note(raw: &str, file_path: &str) -> Result<Note> {
    let (meta, body) = split_frontmatter(raw)
        .ok_or_else(|| Error::frontmatter(file_path, "missing +++ metadata block"))?;

    let frontmatter: Frontmatter =
        toml::from_str(meta).map_err(|e| Error::frontmatter(file_path, e.to_string()))?;

    let created_at = parse_datetime(&frontmatter.created)
        .ok_or_else(|| Error::frontmatter(file_path, format!("bad created timestamp '{}'", frontmatter.created)))?;
    let updated_at = parse_datetime(&frontmatter.updated)
        .ok_or_else(|| Error::frontmatter(file_path, format!("bad updated timestamp '{}'", frontmatter.updated)))?;
    let last_accessed = match frontmatter.last_accessed.as_deref() {
        Some(ts) => Some(
            parse_datetime(ts)
                .ok_or_else(|| Error::frontmatter(file_path, format!("bad last_accessed timestamp '{}'", ts)))?,
        ),
        None => None,
    };

    Ok(Note {
        id: frontmatter.id,
        memory_type: frontmatter.memory_type,
        file_path: file_path.to_string(),
        summary: frontmatter.summary,
        content: body.trim().to_string(),
        tags: frontmatter.tags,
        relevance: clamp_relevance(frontmatter.relevance),
        created_at,
        updated_at,
        source_agent: frontmatter.source_agent,
        source_session: frontmatter.source_session,
        related_files: frontmatter.related_files,
        access_count: frontmatter.access_count,
        last_accessed,
    })
}

/// Split raw text into (metadata, body). The opening delimiter must be the
/// first line; the closing one is the next line consisting only of `+++`.
fn split_frontmatter(raw: &str) -> Option<(&str, &str)> {
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
    let rest = raw
        .strip_prefix("+++\n")
        .or_else(|| raw.strip_prefix("+++\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now_utc;

    fn sample_note() -> Note {
        let now = now_utc();
        Note {
            id: "0190a1b2-c3d4-7e5f-8a9b-0c1d2e3f4a5b".to_string(),
            memory_type: MemoryType::Gotcha,
            file_path: "gotchas/esm-imports.md".to_string(),
            summary: "ESM requires \"quoted\" .js extensions".to_string(),
            content: "Line one.\n\n```ts\nimport x from './x.js';\n```".to_string(),
            tags: vec!["esm".to_string(), "typescript".to_string()],
            relevance: 0.73,
            created_at: now,
            updated_at: now,
            source_agent: Some("claude".to_string()),
            source_session: Some("sess-1".to_string()),
            related_files: vec!["src/index.ts".to_string()],
            access_count: 3,
            last_accessed: Some(now),
        }
    }

    #[test]
    fn test_roundtrip_all_fields() {
        let note = sample_note();
        let raw = serialize_note(&note).unwrap();
        let parsed = parse_note(&raw, &note.file_path).unwrap();
        assert_eq!(parsed, note);
    }

    #[test]
    fn test_roundtrip_minimal_fields() {
        let mut note = sample_note();
        note.tags.clear();
        note.source_agent = None;
        note.source_session = None;
        note.related_files.clear();
        note.access_count = 0;
        note.last_accessed = None;

        let raw = serialize_note(&note).unwrap();
        assert!(!raw.contains("related_files"));
        assert!(!raw.contains("access_count"));
        assert_eq!(parse_note(&raw, &note.file_path).unwrap(), note);
    }

    #[test]
    fn test_body_containing_delimiter_survives() {
        let mut note = sample_note();
        note.content = "before\n+++\nafter".to_string();
        let raw = serialize_note(&note).unwrap();
        assert_eq!(parse_note(&raw, &note.file_path).unwrap().content, note.content);
    }

    #[test]
    fn test_hand_written_file_without_id() {
        let raw = "+++\ntype = \"decision\"\nsummary = \"Use pnpm\"\ncreated = \"2024-01-15T10:30:00.000Z\"\nupdated = \"2024-01-15T10:30:00.000Z\"\n+++\nChose pnpm.\n";
        let note = parse_note(raw, "decisions/use-pnpm.md").unwrap();
        assert!(note.id.is_empty());
        assert_eq!(note.memory_type, MemoryType::Decision);
        assert_eq!(note.relevance, 1.0);
        assert!(note.tags.is_empty());
        assert_eq!(note.content, "Chose pnpm.");
    }

    #[test]
    fn test_out_of_range_relevance_is_clamped() {
        let raw = "+++\ntype = \"gotcha\"\nsummary = \"x\"\nrelevance = 3.5\ncreated = \"2024-01-15T10:30:00.000Z\"\nupdated = \"2024-01-15T10:30:00.000Z\"\n+++\nbody\n";
        assert_eq!(parse_note(raw, "gotchas/x.md").unwrap().relevance, 1.0);
    }

    #[test]
    fn test_malformed_files_are_errors() {
        assert!(parse_note("no metadata here", "gotchas/a.md").is_err());
        assert!(parse_note("+++\ntype = \"gotcha\"\n", "gotchas/a.md").is_err());
        let unknown_type = "+++\ntype = \"bug\"\nsummary = \"x\"\ncreated = \"2024-01-15T10:30:00.000Z\"\nupdated = \"2024-01-15T10:30:00.000Z\"\n+++\nbody\n";
        assert!(parse_note(unknown_type, "gotchas/a.md").is_err());
    }
}
