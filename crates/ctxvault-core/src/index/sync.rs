//! Writing notes into the index.

use std::collections::HashSet;

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::error::Result;
use crate::memory::{path_note_id, NoteStore};
use crate::time::format_datetime;
use crate::types::{ListOptions, Note, RelationType};

use super::SearchIndex;

impl SearchIndex {
    // ─────────────────────────────────────────────────────────────────────────
    // Sync Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Upsert a note and its file relations. Returns the id the row was
    /// stored under (derived from the file path when the note has none).
    ///
    /// A stale row occupying the same file path under another id is removed
    /// first. Relations are only ever added.
    pub fn sync(&self, note: &Note) -> Result<String> {
        let id = if note.id.is_empty() {
            path_note_id(&note.file_path)
        } else {
            note.id.clone()
        };

        let tx = self.conn.unchecked_transaction()?;
        upsert_note(&tx, &id, note)?;
        tx.commit()?;

        debug!("Indexed {} as {}", note.file_path, id);
        Ok(id)
    }

    /// Drop the row for a file path. Relations go with it.
    pub fn remove(&self, file_path: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM memories WHERE file_path = ?1", params![file_path])?;
        Ok(removed)
    }

    /// Drop the rows with the given ids, all in one transaction.
    pub fn remove_by_ids(&self, ids: &[String]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM memories WHERE id = ?1")?;
            for id in ids {
                removed += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Throw the index away and re-index every note in the store, as one
    /// transaction. Returns the number of notes indexed.
    ///
    /// Ids stored in note files are kept; files without one (or sharing one
    /// with a file indexed earlier in the same pass) get an id derived from
    /// their path, so repeated rebuilds produce the same rows.
    pub fn rebuild(&self, store: &NoteStore) -> Result<usize> {
        let notes = store.list(&ListOptions::default())?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch("DELETE FROM file_relations; DELETE FROM memories;")?;

        let mut seen: HashSet<String> = HashSet::with_capacity(notes.len());
        for note in &notes {
            let id = if note.id.is_empty() || seen.contains(&note.id) {
                path_note_id(&note.file_path)
            } else {
                note.id.clone()
            };
            upsert_note(&tx, &id, note)?;
            seen.insert(id);
        }

        tx.execute("INSERT INTO memories_fts(memories_fts) VALUES ('rebuild')", [])?;
        tx.commit()?;

        info!("Rebuilt search index with {} notes", notes.len());
        Ok(notes.len())
    }
}

fn upsert_note(conn: &Connection, id: &str, note: &Note) -> Result<()> {
    conn.execute(
        "DELETE FROM memories WHERE file_path = ?1 AND id <> ?2",
        params![note.file_path, id],
    )?;

    let tags = if note.tags.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&note.tags)?)
    };

    conn.execute(
        "INSERT INTO memories (id, type, file_path, summary, content, tags, relevance,
                               created_at, updated_at, source_agent, source_session,
                               access_count, last_accessed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(id) DO UPDATE SET
            type = excluded.type,
            file_path = excluded.file_path,
            summary = excluded.summary,
            content = excluded.content,
            tags = excluded.tags,
            relevance = excluded.relevance,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            source_agent = excluded.source_agent,
            source_session = excluded.source_session,
            access_count = excluded.access_count,
            last_accessed = excluded.last_accessed",
        params![
            id,
            note.memory_type.as_str(),
            note.file_path,
            note.summary,
            note.content,
            tags,
            note.relevance,
            format_datetime(&note.created_at),
            format_datetime(&note.updated_at),
            note.source_agent,
            note.source_session,
            note.access_count,
            note.last_accessed.as_ref().map(format_datetime),
        ],
    )?;

    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO file_relations (memory_id, file_path, relation) VALUES (?1, ?2, ?3)",
    )?;
    for related in &note.related_files {
        stmt.execute(params![id, related, RelationType::Related.as_str()])?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CreateNoteInput, MemoryType, UpdateNoteInput};
    use tempfile::tempdir;

    fn relation_count(index: &SearchIndex) -> i64 {
        index
            .conn
            .query_row("SELECT COUNT(*) FROM file_relations", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_sync_then_resync_keeps_one_row() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let index = SearchIndex::open_in_memory().unwrap();

        let note = store
            .create(CreateNoteInput::new(MemoryType::Gotcha, "Barrel files", "They cause cycles."))
            .unwrap();
        assert_eq!(index.sync(&note).unwrap(), note.id);

        let edited = store
            .update(
                &note.file_path,
                UpdateNoteInput {
                    summary: Some("Barrel files cause import cycles".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        index.sync(&edited).unwrap();

        assert_eq!(index.count().unwrap(), 1);
        let stored = index.get_by_path(&note.file_path).unwrap().unwrap();
        assert_eq!(stored.summary, "Barrel files cause import cycles");
        assert_eq!(index.search("cycles", &Default::default()).unwrap().len(), 1);
        assert!(index.search("Barrel", &Default::default()).unwrap().len() == 1);
    }

    #[test]
    fn test_sync_replaces_stale_row_at_same_path() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let index = SearchIndex::open_in_memory().unwrap();

        let mut note = store
            .create(CreateNoteInput::new(MemoryType::Gotcha, "Stale row", "First body."))
            .unwrap();
        index.sync(&note).unwrap();

        note.id = String::new();
        note.content = "Second body.".to_string();
        let fresh_id = index.sync(&note).unwrap();
        assert_eq!(fresh_id, path_note_id(&note.file_path));

        assert_eq!(index.count().unwrap(), 1);
        assert_eq!(index.get_by_path(&note.file_path).unwrap().unwrap().id, fresh_id);
        assert!(index.search("First", &Default::default()).unwrap().is_empty());
    }

    #[test]
    fn test_relations_accumulate() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let index = SearchIndex::open_in_memory().unwrap();

        let note = store
            .create(
                CreateNoteInput::new(MemoryType::Gotcha, "Related files", "Body.")
                    .with_related_files(["src/a.ts"]),
            )
            .unwrap();
        index.sync(&note).unwrap();

        let moved = store
            .update(
                &note.file_path,
                UpdateNoteInput {
                    related_files: Some(vec!["src/b.ts".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        index.sync(&moved).unwrap();
        index.sync(&moved).unwrap();

        assert_eq!(relation_count(&index), 2);
        let types = [MemoryType::Gotcha];
        assert_eq!(index.find_by_related_file("src/a.ts", &types, 5).unwrap().len(), 1);
        assert_eq!(index.find_by_related_file("src/b.ts", &types, 5).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_cascades_relations() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let index = SearchIndex::open_in_memory().unwrap();

        let note = store
            .create(
                CreateNoteInput::new(MemoryType::Solution, "Fix flaky test", "Use fake timers.")
                    .with_related_files(["test/a.test.ts", "test/b.test.ts"]),
            )
            .unwrap();
        index.sync(&note).unwrap();
        assert_eq!(relation_count(&index), 2);

        assert_eq!(index.remove(&note.file_path).unwrap(), 1);
        assert_eq!(index.remove(&note.file_path).unwrap(), 0);
        assert_eq!(relation_count(&index), 0);
        assert!(index.search("timers", &Default::default()).unwrap().is_empty());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let index = SearchIndex::open_in_memory().unwrap();

        store
            .create(
                CreateNoteInput::new(MemoryType::Gotcha, "ESM needs js extensions", "Use .js.")
                    .with_related_files(["src/index.ts"]),
            )
            .unwrap();
        store
            .create(CreateNoteInput::new(MemoryType::Decision, "Use pnpm", "Workspaces."))
            .unwrap();
        std::fs::write(
            temp.path().join("decisions/hand-written.md"),
            "+++\ntype = \"decision\"\nsummary = \"Hand written\"\ncreated = \"2024-01-15T10:30:00.000Z\"\nupdated = \"2024-01-15T10:30:00.000Z\"\n+++\nBody.\n",
        )
        .unwrap();

        assert_eq!(index.rebuild(&store).unwrap(), 3);
        let first: Vec<Note> = index.all().unwrap();
        let first_relations = relation_count(&index);

        assert_eq!(index.rebuild(&store).unwrap(), 3);
        let second: Vec<Note> = index.all().unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(first_relations, relation_count(&index));
        let hand_written = first
            .iter()
            .find(|n| n.file_path == "decisions/hand-written.md")
            .map(|n| n.id.clone());
        assert_eq!(hand_written, Some(path_note_id("decisions/hand-written.md")));
        assert_eq!(first, second);
        assert_eq!(index.search("pnpm", &Default::default()).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_by_ids() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let index = SearchIndex::open_in_memory().unwrap();

        let mut ids = Vec::new();
        for summary in ["First note", "Second note", "Third note"] {
            let input = CreateNoteInput::new(MemoryType::Gotcha, summary, "Body.")
                .with_related_files(["src/a.ts"]);
            let note = store.create(input).unwrap();
            ids.push(index.sync(&note).unwrap());
        }

        assert_eq!(index.remove_by_ids(&ids[..2]).unwrap(), 2);
        assert_eq!(index.remove_by_ids(&ids[..2]).unwrap(), 0);
        assert_eq!(index.count().unwrap(), 1);
        assert_eq!(relation_count(&index), 1);
    }

    #[test]
    fn test_rebuild_drops_rows_for_deleted_files() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let index = SearchIndex::open_in_memory().unwrap();

        let note = store
            .create(CreateNoteInput::new(MemoryType::Discovery, "Vite caches deps", "In node_modules/.vite."))
            .unwrap();
        index.sync(&note).unwrap();
        store.delete(&note.file_path).unwrap();

        assert_eq!(index.rebuild(&store).unwrap(), 0);
        assert_eq!(index.count().unwrap(), 0);
        assert!(index.search("Vite", &Default::default()).unwrap().is_empty());
    }
}
