//! Ranked search and typed lookups.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Params};
use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::time::format_datetime;
use crate::types::{MemoryType, Note};

use super::fts::FtsQuery;
use super::{SearchIndex, NOTE_COLUMNS};

/// Default number of search hits.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Default number of notes returned for a related-file lookup.
pub const DEFAULT_RELATED_LIMIT: usize = 5;

/// BM25 weights for the summary, content and tags columns.
const BM25_RANK: &str = "bm25(memories_fts, 5.0, 1.0, 2.0)";

/// A note returned by a query, with its rank.
///
/// For full-text hits `rank` is the raw BM25 score (more negative is a
/// better match). Related-file lookups report `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub note: Note,
    pub rank: f64,
}

/// Options for [`SearchIndex::search`].
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub memory_type: Option<MemoryType>,
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            memory_type: None,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl SearchIndex {
    // ─────────────────────────────────────────────────────────────────────────
    // Full-text Search
    // ─────────────────────────────────────────────────────────────────────────

    /// Ranked full-text search over summary, content and tags.
    ///
    /// All terms must match; if that finds nothing and the query has several
    /// terms, any term may match. A query the engine rejects yields no hits.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let Some(parsed) = FtsQuery::parse(query) else {
            return Ok(Vec::new());
        };

        let mut hits = recover(
            query,
            self.ranked_matches(&parsed.all_terms(), options.memory_type, options.limit),
        )?;
        if hits.is_empty() && parsed.len() > 1 {
            hits = recover(
                query,
                self.ranked_matches(&parsed.any_term(), options.memory_type, options.limit),
            )?;
        }

        for hit in &mut hits {
            hit.note.related_files = self.related_files(&hit.note.id)?;
        }
        Ok(hits)
    }

    /// Number of rows of `memory_type` matching a raw FTS5 expression.
    pub fn match_count(&self, expr: &str, memory_type: MemoryType) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*)
                 FROM memories_fts
                 JOIN memories m ON m.rowid = memories_fts.rowid
                 WHERE memories_fts MATCH ?1 AND m.type = ?2",
                params![expr, memory_type.as_str()],
                |row| row.get(0),
            )
            .map_err(query_error)?;
        Ok(count as usize)
    }

    /// Notes of `memory_type` matching a raw FTS5 expression, best first,
    /// excluding the note with id `exclude_id`.
    pub fn similar(&self, expr: &str, memory_type: MemoryType, exclude_id: &str) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS}
             FROM memories_fts
             JOIN memories m ON m.rowid = memories_fts.rowid
             WHERE memories_fts MATCH ?1 AND m.type = ?2 AND m.id <> ?3
             ORDER BY {BM25_RANK}"
        );
        self.query_notes(&sql, params![expr, memory_type.as_str(), exclude_id])
            .map_err(query_error)
    }

    fn ranked_matches(
        &self,
        expr: &str,
        memory_type: Option<MemoryType>,
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let sql = format!(
            "SELECT {NOTE_COLUMNS}, {BM25_RANK} AS score
             FROM memories_fts
             JOIN memories m ON m.rowid = memories_fts.rowid
             WHERE memories_fts MATCH ?1 AND (?2 IS NULL OR m.type = ?2)
             ORDER BY score
             LIMIT ?3"
        );
        self.query_hits(&sql, params![expr, memory_type.map(|t| t.as_str()), limit as i64])
            .map_err(query_error)
    }

    fn query_notes(&self, sql: &str, params: impl Params) -> rusqlite::Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(sql)?;
        let notes = stmt
            .query_map(params, Self::map_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    fn query_hits(&self, sql: &str, params: impl Params) -> rusqlite::Result<Vec<SearchHit>> {
        let mut stmt = self.conn.prepare(sql)?;
        let hits = stmt
            .query_map(params, |row| {
                Ok(SearchHit {
                    note: Self::map_note(row)?,
                    rank: row.get(13)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(hits)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// Notes linked to a project file, restricted to `types`, highest
    /// relevance first.
    pub fn find_by_related_file(
        &self,
        file_path: &str,
        types: &[MemoryType],
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        if types.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let placeholders = (0..types.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {NOTE_COLUMNS}
             FROM memories m
             JOIN file_relations r ON r.memory_id = m.id
             WHERE r.file_path = ?1 AND m.type IN ({placeholders})
             ORDER BY m.relevance DESC, m.file_path
             LIMIT ?2"
        );

        let mut values = vec![Value::Text(file_path.to_string()), Value::Integer(limit as i64)];
        values.extend(types.iter().map(|t| Value::Text(t.as_str().to_string())));

        let notes = self.query_notes(&sql, params_from_iter(values))?;

        notes
            .into_iter()
            .map(|mut note| {
                note.related_files = self.related_files(&note.id)?;
                Ok(SearchHit { note, rank: 0.0 })
            })
            .collect()
    }

    /// Get the indexed note at a vault-relative path.
    pub fn get_by_path(&self, file_path: &str) -> Result<Option<Note>> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM memories m WHERE m.file_path = ?1");
        let note = self
            .conn
            .query_row(&sql, params![file_path], Self::map_note)
            .optional()?;
        self.with_relations(note)
    }

    /// Get the indexed note with the given id.
    pub fn get(&self, id: &str) -> Result<Option<Note>> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM memories m WHERE m.id = ?1");
        let note = self
            .conn
            .query_row(&sql, params![id], Self::map_note)
            .optional()?;
        self.with_relations(note)
    }

    /// Every indexed note, highest relevance first.
    pub fn all(&self) -> Result<Vec<Note>> {
        let sql = format!("SELECT {NOTE_COLUMNS} FROM memories m ORDER BY m.relevance DESC, m.file_path");
        let notes = self.query_notes(&sql, [])?;

        notes
            .into_iter()
            .map(|mut note| {
                note.related_files = self.related_files(&note.id)?;
                Ok(note)
            })
            .collect()
    }

    /// Number of indexed notes.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Project files linked to a note, in insertion order.
    pub fn related_files(&self, id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT file_path FROM file_relations WHERE memory_id = ?1 ORDER BY rowid")?;
        let files = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(files)
    }

    fn with_relations(&self, note: Option<Note>) -> Result<Option<Note>> {
        match note {
            Some(mut note) => {
                note.related_files = self.related_files(&note.id)?;
                Ok(Some(note))
            }
            None => Ok(None),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Relevance Updates
    // ─────────────────────────────────────────────────────────────────────────

    /// Set a note's relevance. Returns whether a row was updated.
    pub fn update_relevance(&self, id: &str, relevance: f64) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE memories SET relevance = ?2 WHERE id = ?1",
            params![id, relevance],
        )?;
        Ok(updated > 0)
    }

    /// Set several relevance scores in one transaction.
    pub fn update_relevances(&self, updates: &[(String, f64)]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached("UPDATE memories SET relevance = ?2 WHERE id = ?1")?;
            for (id, relevance) in updates {
                stmt.execute(params![id, relevance])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Record an access: new relevance, one more hit, `last_accessed = at`.
    pub fn record_access(&self, id: &str, relevance: f64, at: DateTime<Utc>) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE memories
             SET relevance = ?2, access_count = access_count + 1, last_accessed = ?3
             WHERE id = ?1",
            params![id, relevance, format_datetime(&at)],
        )?;
        Ok(updated > 0)
    }
}

/// Classify a failed full-text query. Only expressions the FTS5 parser
/// rejects become [`Error::IndexQuery`]; everything else (missing tables,
/// locks, I/O, corruption) stays a database error.
fn query_error(e: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(_, Some(message)) = &e {
        if is_fts_syntax_error(message) {
            return Error::IndexQuery(message.clone());
        }
    }
    Error::Database(e)
}

fn is_fts_syntax_error(message: &str) -> bool {
    message.starts_with("fts5:")
        || message.starts_with("unterminated string")
        || message.starts_with("unknown special query")
}

/// Turn a rejected full-text query into an empty result.
fn recover(query: &str, result: Result<Vec<SearchHit>>) -> Result<Vec<SearchHit>> {
    match result {
        Err(Error::IndexQuery(message)) => {
            warn!("Search for '{}' failed: {}", query, message);
            Ok(Vec::new())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::NoteStore;
    use crate::time::now_utc;
    use crate::types::CreateNoteInput;
    use tempfile::{tempdir, TempDir};

    fn seeded() -> (TempDir, NoteStore, SearchIndex) {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let index = SearchIndex::open_in_memory().unwrap();

        let inputs = [
            CreateNoteInput::new(
                MemoryType::Gotcha,
                "ESM requires .js extensions",
                "TypeScript ESM projects must use .js in relative import paths.",
            )
            .with_tags(["esm", "typescript"])
            .with_related_files(["src/index.ts"]),
            CreateNoteInput::new(
                MemoryType::Decision,
                "Use pnpm workspaces",
                "We chose pnpm for strict dependency isolation.",
            )
            .with_tags(["tooling"])
            .with_related_files(["package.json"]),
        ];
        for input in inputs {
            let note = store.create(input).unwrap();
            index.sync(&note).unwrap();
        }
        (temp, store, index)
    }

    #[test]
    fn test_search_scenario() {
        let (_temp, _store, index) = seeded();

        let hits = index.search("ESM extensions", &SearchOptions::default()).unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].note.summary, "ESM requires .js extensions");
        assert_eq!(hits[0].note.related_files, vec!["src/index.ts"]);
        assert!(hits[0].rank < 0.0);

        let hits = index
            .search("pnpm workspaces monorepo", &SearchOptions::default())
            .unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].note.summary, "Use pnpm workspaces");
    }

    #[test]
    fn test_search_type_filter_and_limit() {
        let (_temp, _store, index) = seeded();

        let options = SearchOptions {
            memory_type: Some(MemoryType::Decision),
            ..Default::default()
        };
        assert!(index.search("ESM", &options).unwrap().is_empty());

        let options = SearchOptions {
            limit: 1,
            ..Default::default()
        };
        assert_eq!(index.search("ESM pnpm", &options).unwrap().len(), 1);
    }

    #[test]
    fn test_summary_outranks_content() {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let index = SearchIndex::open_in_memory().unwrap();

        let in_content = store
            .create(CreateNoteInput::new(
                MemoryType::Discovery,
                "Build output location",
                "The vite bundle lands in dist by default.",
            ))
            .unwrap();
        let in_summary = store
            .create(CreateNoteInput::new(
                MemoryType::Discovery,
                "Vite bundle caching",
                "Dependencies are prebuilt into a cache folder.",
            ))
            .unwrap();
        index.sync(&in_content).unwrap();
        index.sync(&in_summary).unwrap();

        let hits = index.search("vite", &SearchOptions::default()).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].note.id, in_summary.id);
    }

    #[test]
    fn test_special_characters_never_error() {
        let (_temp, _store, index) = seeded();
        for query in [
            "\"unbalanced",
            "ESM*",
            "(ESM OR",
            "NOT",
            "AND OR NEAR",
            "col:ESM",
            "^ESM",
            "-- ; DROP TABLE memories",
            "",
            "  ",
        ] {
            assert!(index.search(query, &SearchOptions::default()).is_ok(), "query {:?}", query);
        }
        assert_eq!(index.count().unwrap(), 2);
    }

    #[test]
    fn test_raw_expression_errors_surface_as_index_query() {
        let (_temp, _store, index) = seeded();
        let err = index.match_count("NOT OR this", MemoryType::Gotcha).unwrap_err();
        assert!(matches!(err, Error::IndexQuery(_)));
        assert!(matches!(
            index.similar("(", MemoryType::Gotcha, ""),
            Err(Error::IndexQuery(_))
        ));
    }

    #[test]
    fn test_storage_failures_are_not_swallowed() {
        let (_temp, _store, index) = seeded();
        index.conn.execute_batch("DROP TABLE memories_fts").unwrap();

        let err = index.search("anything", &SearchOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert!(matches!(
            index.match_count("ESM", MemoryType::Gotcha),
            Err(Error::Database(_))
        ));
    }

    #[test]
    fn test_match_count_and_similar() {
        let (_temp, _store, index) = seeded();
        assert_eq!(index.match_count("ESM OR pnpm", MemoryType::Gotcha).unwrap(), 1);
        assert_eq!(index.match_count("ESM OR pnpm", MemoryType::Solution).unwrap(), 0);

        let gotcha = index.get_by_path("gotchas/esm-requires-js-extensions.md").unwrap().unwrap();
        assert!(index.similar("ESM", MemoryType::Gotcha, &gotcha.id).unwrap().is_empty());
        assert_eq!(index.similar("ESM", MemoryType::Gotcha, "other").unwrap().len(), 1);
    }

    #[test]
    fn test_find_by_related_file() {
        let (_temp, store, index) = seeded();
        let solution = store
            .create(
                CreateNoteInput::new(MemoryType::Solution, "Fix import paths", "Add .js suffix.")
                    .with_related_files(["src/index.ts"]),
            )
            .unwrap();
        index.sync(&solution).unwrap();
        index.update_relevance(&solution.id, 0.5).unwrap();

        let both = [MemoryType::Gotcha, MemoryType::Solution];
        let hits = index.find_by_related_file("src/index.ts", &both, 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].note.memory_type, MemoryType::Gotcha);
        assert_eq!(hits[1].note.relevance, 0.5);
        assert!(hits.iter().all(|h| h.rank == 0.0));

        let only_decisions = [MemoryType::Decision];
        assert!(index.find_by_related_file("src/index.ts", &only_decisions, 5).unwrap().is_empty());
        assert!(index.find_by_related_file("src/index.ts", &[], 5).unwrap().is_empty());
        assert_eq!(index.find_by_related_file("src/index.ts", &both, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_record_access_and_relevance_updates() {
        let (_temp, _store, index) = seeded();
        let note = index.get_by_path("decisions/use-pnpm-workspaces.md").unwrap().unwrap();

        let at = now_utc();
        assert!(index.record_access(&note.id, 0.8, at).unwrap());
        let touched = index.get(&note.id).unwrap().unwrap();
        assert_eq!(touched.relevance, 0.8);
        assert_eq!(touched.access_count, 1);
        assert_eq!(touched.last_accessed, Some(at));

        index.update_relevances(&[(note.id.clone(), 0.1)]).unwrap();
        assert_eq!(index.get(&note.id).unwrap().unwrap().relevance, 0.1);
        assert!(!index.update_relevance("missing", 0.5).unwrap());

        let all = index.all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].id, note.id);
    }
}
