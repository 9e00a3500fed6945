//! SQLite search index over the note store.
//!
//! The index is a disposable projection of the markdown notes: a `memories`
//! table mirroring note metadata, an FTS5 shadow table over summary, content
//! and tags, and `file_relations` linking notes to project files. Anything in
//! here can be regenerated from disk with [`SearchIndex::rebuild`].

mod fts;
mod search;
mod sync;

pub use fts::{build_disjunctive_query, sanitize_query, FtsQuery};
pub use search::{SearchHit, SearchOptions, DEFAULT_RELATED_LIMIT, DEFAULT_SEARCH_LIMIT};

use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use tracing::debug;

use crate::error::{Error, Result};
use crate::time::parse_datetime;
use crate::types::{MemoryType, Note};

/// Columns selected for every note projection, in `map_note` order.
pub(crate) const NOTE_COLUMNS: &str = "m.id, m.type, m.file_path, m.summary, m.content, m.tags, \
     m.relevance, m.created_at, m.updated_at, m.source_agent, m.source_session, \
     m.access_count, m.last_accessed";

/// Search index connection.
///
/// Not `Sync`: the engine is single-threaded and each process opens its own
/// handle.
pub struct SearchIndex {
    conn: Connection,
}

impl SearchIndex {
    /// Open (creating if needed) the index database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        debug!("Opened search index at {}", path.display());
        Self::init(conn)
    }

    /// Open a private in-memory index.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let index = Self { conn };
        index.migrate()?;
        Ok(index)
    }

    /// Apply the embedded schema. Every statement is `IF NOT EXISTS`, so
    /// running it against an existing index is a no-op.
    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(include_str!("migrations/001_index_tables.sql"))?;
        Ok(())
    }

    /// Map a row selected with [`NOTE_COLUMNS`] into a note. Related files
    /// are loaded separately.
    pub(crate) fn map_note(row: &Row) -> rusqlite::Result<Note> {
        let memory_type: String = row.get(1)?;
        let memory_type = memory_type
            .parse::<MemoryType>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

        let tags: Option<String> = row.get(5)?;
        let tags = match tags.as_deref() {
            Some(json) if !json.is_empty() => serde_json::from_str(json)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
            _ => Vec::new(),
        };

        let last_accessed: Option<String> = row.get(12)?;
        let last_accessed = match last_accessed {
            Some(ts) => Some(timestamp(12, &ts)?),
            None => None,
        };

        Ok(Note {
            id: row.get(0)?,
            memory_type,
            file_path: row.get(2)?,
            summary: row.get(3)?,
            content: row.get(4)?,
            tags,
            relevance: row.get(6)?,
            created_at: timestamp(7, &row.get::<_, String>(7)?)?,
            updated_at: timestamp(8, &row.get::<_, String>(8)?)?,
            source_agent: row.get(9)?,
            source_session: row.get(10)?,
            related_files: Vec::new(),
            access_count: row.get(11)?,
            last_accessed,
        })
    }
}

fn timestamp(column: usize, value: &str) -> rusqlite::Result<chrono::DateTime<chrono::Utc>> {
    parse_datetime(value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            Type::Text,
            Box::new(Error::Serialization(format!("bad timestamp '{}'", value))),
        )
    })
}
