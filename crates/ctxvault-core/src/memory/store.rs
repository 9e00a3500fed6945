//! File-backed note store.
//!
//! The store is the ground truth for every note. It only touches the
//! filesystem; keeping the search index in step is the caller's job.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::time::now_utc;
use crate::types::{
    clamp_relevance, CreateNoteInput, ListOptions, MemoryType, Note, SortBy, UpdateNoteInput,
};

use super::frontmatter::{parse_note, serialize_note};
use super::slug::slugify;
use super::validation::{normalize_content, normalize_set, validate_create, validate_summary};

/// Generate a new note identifier (UUIDv7, time-sortable).
///
/// `Uuid::now_v7` keeps a process-wide counter, so identifiers created in the
/// same millisecond still sort in creation order.
pub fn new_note_id() -> String {
    Uuid::now_v7().to_string()
}

/// Stable id for a note file that carries none, derived from its path so
/// that re-indexing the same file always yields the same id.
pub fn path_note_id(file_path: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("ctxvault:{}", file_path).as_bytes()).to_string()
}

/// Number of notes per type; every type is present, possibly with 0.
pub fn tally_by_type(notes: &[Note]) -> BTreeMap<MemoryType, usize> {
    let mut counts: BTreeMap<MemoryType, usize> = MemoryType::ALL.iter().map(|t| (*t, 0)).collect();
    for note in notes {
        *counts.entry(note.memory_type).or_insert(0) += 1;
    }
    counts
}

/// CRUD over the markdown notes under a vault root.
#[derive(Debug, Clone)]
pub struct NoteStore {
    root: PathBuf,
}

impl NoteStore {
    /// Create a store rooted at `root` (usually `<project>/.ctx`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Vault root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create every type directory.
    pub fn ensure_layout(&self) -> Result<()> {
        for memory_type in MemoryType::ALL {
            fs::create_dir_all(self.root.join(memory_type.dir_name()))?;
        }
        Ok(())
    }

    /// Create a new note and write it to disk.
    ///
    /// The file lands at `<type dir>/<slug>.md`. If that path is already
    /// taken the id's tail is appended, so an existing note is never
    /// overwritten by a near-identical summary.
    pub fn create(&self, input: CreateNoteInput) -> Result<Note> {
        let input = validate_create(input)?;
        let id = new_note_id();
        let now = now_utc();

        let dir = input.memory_type.dir_name();
        let dir_path = self.root.join(dir);
        fs::create_dir_all(&dir_path)?;

        let slug = slugify(&input.summary);
        let mut file_name = format!("{}.md", slug);
        if dir_path.join(&file_name).exists() {
            file_name = format!("{}-{}.md", slug, id_suffix(&id));
            debug!("Slug collision in {}, using {}", dir, file_name);
        }

        let note = Note {
            id,
            memory_type: input.memory_type,
            file_path: format!("{}/{}", dir, file_name),
            summary: input.summary,
            content: input.content,
            tags: input.tags,
            relevance: 1.0,
            created_at: now,
            updated_at: now,
            source_agent: input.source_agent,
            source_session: input.source_session,
            related_files: input.related_files,
            access_count: 0,
            last_accessed: None,
        };

        self.write(&note)?;
        debug!("Created note {} at {}", note.id, note.file_path);
        Ok(note)
    }

    /// Read the note at a vault-relative path. Absent files yield `None`.
    pub fn read(&self, rel_path: &str) -> Result<Option<Note>> {
        let abs_path = self.resolve(rel_path)?;
        let raw = match fs::read_to_string(&abs_path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        parse_note(&raw, rel_path).map(Some)
    }

    /// Apply a partial update and refresh `updated_at`.
    pub fn update(&self, rel_path: &str, changes: UpdateNoteInput) -> Result<Option<Note>> {
        let Some(mut note) = self.read(rel_path)? else {
            return Ok(None);
        };

        if let Some(summary) = changes.summary {
            validate_summary(&summary)?;
            note.summary = summary;
        }
        if let Some(content) = changes.content {
            note.content = normalize_content(&content)?;
        }
        if let Some(tags) = changes.tags {
            note.tags = normalize_set("tags", tags)?;
        }
        if let Some(related_files) = changes.related_files {
            note.related_files = normalize_set("related_files", related_files)?;
        }
        if let Some(relevance) = changes.relevance {
            note.relevance = clamp_relevance(relevance);
        }
        note.updated_at = now_utc();

        self.write(&note)?;
        Ok(Some(note))
    }

    /// Overwrite the relevance score only. Used by decay; leaves `updated_at`
    /// and every content field alone.
    pub fn set_relevance(&self, rel_path: &str, relevance: f64) -> Result<Option<Note>> {
        let Some(mut note) = self.read(rel_path)? else {
            return Ok(None);
        };
        note.relevance = clamp_relevance(relevance);
        self.write(&note)?;
        Ok(Some(note))
    }

    /// Record an access: new relevance, one more hit, fresh `last_accessed`.
    pub fn record_access(
        &self,
        rel_path: &str,
        relevance: f64,
        accessed_at: DateTime<Utc>,
    ) -> Result<Option<Note>> {
        let Some(mut note) = self.read(rel_path)? else {
            return Ok(None);
        };
        note.relevance = clamp_relevance(relevance);
        note.access_count = note.access_count.saturating_add(1);
        note.last_accessed = Some(accessed_at);
        self.write(&note)?;
        Ok(Some(note))
    }

    /// Delete the note file. Returns whether anything was removed.
    pub fn delete(&self, rel_path: &str) -> Result<bool> {
        let abs_path = self.resolve(rel_path)?;
        match fs::remove_file(&abs_path) {
            Ok(()) => {
                debug!("Deleted note {}", rel_path);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List notes across all type directories.
    ///
    /// Files that fail to parse are logged and skipped.
    pub fn list(&self, options: &ListOptions) -> Result<Vec<Note>> {
        let mut notes = Vec::new();
        for memory_type in MemoryType::ALL {
            let dir = memory_type.dir_name();
            let dir_path = self.root.join(dir);
            if !dir_path.is_dir() {
                continue;
            }

            let mut file_names: Vec<String> = fs::read_dir(&dir_path)?
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
                .filter_map(|entry| entry.file_name().into_string().ok())
                .filter(|name| name.ends_with(".md"))
                .collect();
            file_names.sort();

            for file_name in file_names {
                let rel_path = format!("{}/{}", dir, file_name);
                match self.read(&rel_path) {
                    Ok(Some(note)) => notes.push(note),
                    Ok(None) => {}
                    Err(e) => warn!("Skipping unreadable note {}: {}", rel_path, e),
                }
            }
        }

        if let Some(memory_type) = options.memory_type {
            notes.retain(|n| n.memory_type == memory_type);
        }

        match options.sort_by {
            SortBy::Relevance => notes.sort_by(|a, b| b.relevance.total_cmp(&a.relevance)),
            SortBy::Created => notes.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortBy::Updated => notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at)),
        }

        if let Some(limit) = options.limit.filter(|l| *l > 0) {
            notes.truncate(limit);
        }

        Ok(notes)
    }

    /// Write a note to its path via a temp file + rename.
    fn write(&self, note: &Note) -> Result<()> {
        let abs_path = self.resolve(&note.file_path)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let raw = serialize_note(note)?;
        let tmp_path = abs_path.with_extension("md.tmp");
        fs::write(&tmp_path, raw)?;
        fs::rename(&tmp_path, &abs_path)?;
        Ok(())
    }

    /// Resolve a vault-relative path, refusing anything that escapes the root.
    fn resolve(&self, rel_path: &str) -> Result<PathBuf> {
        let path = Path::new(rel_path);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if rel_path.is_empty() || escapes {
            return Err(Error::validation(format!(
                "note path must be relative to the vault root: {}",
                rel_path
            )));
        }
        Ok(self.root.join(path))
    }
}

/// Short, collision-resistant suffix taken from the random tail of an id.
fn id_suffix(id: &str) -> String {
    let hex: String = id.chars().filter(|c| *c != '-').collect();
    hex[hex.len().saturating_sub(8)..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gotcha(summary: &str) -> CreateNoteInput {
        CreateNoteInput::new(MemoryType::Gotcha, summary, "Barrel files can cause cycles.")
            .with_tags(["esm", "imports"])
    }

    #[test]
    fn test_create_and_read() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());

        let note = store
            .create(gotcha("Watch out for circular imports").with_related_files(["src/index.ts"]))
            .unwrap();
        assert_eq!(note.file_path, "gotchas/watch-out-for-circular-imports.md");
        assert_eq!(note.relevance, 1.0);
        assert_eq!(note.access_count, 0);
        assert!(temp.path().join(&note.file_path).exists());

        let read = store.read(&note.file_path).unwrap().expect("note exists");
        assert_eq!(read, note);
    }

    #[test]
    fn test_convention_written_to_system_dir() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());

        let note = store
            .create(CreateNoteInput::new(MemoryType::Convention, "Use tabs", "Tabs everywhere."))
            .unwrap();
        assert_eq!(note.file_path, "system/use-tabs.md");
    }

    #[test]
    fn test_create_rejects_invalid_input() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());

        let too_long = gotcha(&"x".repeat(201));
        assert!(store.create(too_long).unwrap_err().is_validation());

        let empty_body = CreateNoteInput::new(MemoryType::Gotcha, "Summary", "   ");
        assert!(store.create(empty_body).unwrap_err().is_validation());

        assert!(store.list(&ListOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_ids_are_monotonic() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());

        let ids: Vec<String> = (0..20)
            .map(|i| store.create(gotcha(&format!("Gotcha number {}", i))).unwrap().id)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_slug_collision_does_not_overwrite() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());

        let first = store.create(gotcha("Careful with dates!")).unwrap();
        let second = store.create(gotcha("Careful with dates?")).unwrap();

        assert_eq!(first.file_path, "gotchas/careful-with-dates.md");
        assert_ne!(first.file_path, second.file_path);
        assert!(second.file_path.starts_with("gotchas/careful-with-dates-"));
        assert_eq!(store.list(&ListOptions::default()).unwrap().len(), 2);
        assert_eq!(store.read(&first.file_path).unwrap().unwrap().summary, "Careful with dates!");
    }

    #[test]
    fn test_read_missing_returns_none() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        assert!(store.read("gotchas/nope.md").unwrap().is_none());
    }

    #[test]
    fn test_paths_outside_root_rejected() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        assert!(store.read("../secrets.md").is_err());
        assert!(store.delete("/etc/passwd").is_err());
    }

    #[test]
    fn test_update_applies_only_supplied_fields() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let note = store.create(gotcha("Original summary")).unwrap();

        let updated = store
            .update(
                &note.file_path,
                UpdateNoteInput {
                    content: Some("New body".to_string()),
                    relevance: Some(1.5),
                    ..Default::default()
                },
            )
            .unwrap()
            .expect("note exists");

        assert_eq!(updated.summary, "Original summary");
        assert_eq!(updated.tags, note.tags);
        assert_eq!(updated.content, "New body");
        assert_eq!(updated.relevance, 1.0);
        assert_eq!(updated.file_path, note.file_path);
        assert_eq!(updated.id, note.id);
        assert!(updated.updated_at >= note.updated_at);

        assert_eq!(store.read(&note.file_path).unwrap().unwrap(), updated);
    }

    #[test]
    fn test_update_missing_returns_none() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let result = store
            .update("gotchas/nope.md", UpdateNoteInput { relevance: Some(0.5), ..Default::default() })
            .unwrap();
        assert!(result.is_none());
        assert!(!temp.path().join("gotchas/nope.md").exists());
    }

    #[test]
    fn test_record_access_keeps_updated_timestamp() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let note = store.create(gotcha("Access me")).unwrap();

        let at = now_utc();
        let touched = store.record_access(&note.file_path, 0.4, at).unwrap().unwrap();
        assert_eq!(touched.relevance, 0.4);
        assert_eq!(touched.access_count, 1);
        assert_eq!(touched.last_accessed, Some(at));
        assert_eq!(touched.updated_at, note.updated_at);
        assert_eq!(touched.summary, note.summary);
    }

    #[test]
    fn test_delete() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let note = store.create(gotcha("Delete me")).unwrap();

        assert!(store.delete(&note.file_path).unwrap());
        assert!(!store.delete(&note.file_path).unwrap());
        assert!(store.read(&note.file_path).unwrap().is_none());
    }

    #[test]
    fn test_list_filters_sorts_and_limits() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());

        let a = store.create(gotcha("First gotcha")).unwrap();
        let b = store.create(gotcha("Second gotcha")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store
            .create(CreateNoteInput::new(MemoryType::Decision, "Use pnpm", "Chose pnpm."))
            .unwrap();
        store.set_relevance(&a.file_path, 0.3).unwrap();

        let all = store.list(&ListOptions::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.last().unwrap().file_path, a.file_path);

        let gotchas = store
            .list(&ListOptions {
                memory_type: Some(MemoryType::Gotcha),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(gotchas.len(), 2);
        assert_eq!(gotchas[0].file_path, b.file_path);

        let newest = store
            .list(&ListOptions {
                sort_by: SortBy::Created,
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(newest.len(), 1);
        assert_eq!(newest[0].summary, "Use pnpm");
    }

    #[test]
    fn test_list_skips_unparsable_files() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        store.create(gotcha("Valid note")).unwrap();

        fs::write(temp.path().join("gotchas/broken.md"), "not a note").unwrap();
        fs::write(temp.path().join("gotchas/readme.txt"), "ignored").unwrap();

        let notes = store.list(&ListOptions::default()).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].summary, "Valid note");
    }

    #[test]
    fn test_tally_by_type() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        store.create(gotcha("One")).unwrap();
        store.create(gotcha("Two")).unwrap();

        let counts = tally_by_type(&store.list(&ListOptions::default()).unwrap());
        assert_eq!(counts[&MemoryType::Gotcha], 2);
        assert_eq!(counts[&MemoryType::Decision], 0);
    }
}
