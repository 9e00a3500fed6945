//! Shared types for ctxvault-core.
//!
//! These types are used by the note store, the search index and the
//! injection layer alike.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Enumerations
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of memory a note records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    Gotcha,
    Decision,
    Solution,
    Discovery,
    Convention,
}

impl MemoryType {
    /// Every memory type, in directory walk order.
    pub const ALL: [MemoryType; 5] = [
        Self::Gotcha,
        Self::Decision,
        Self::Solution,
        Self::Discovery,
        Self::Convention,
    ];

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gotcha => "gotcha",
            Self::Decision => "decision",
            Self::Solution => "solution",
            Self::Discovery => "discovery",
            Self::Convention => "convention",
        }
    }

    /// Directory (relative to the vault root) holding notes of this type.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Gotcha => "gotchas",
            Self::Decision => "decisions",
            Self::Solution => "solutions",
            Self::Discovery => "discoveries",
            Self::Convention => "system",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gotcha" => Ok(Self::Gotcha),
            "decision" => Ok(Self::Decision),
            "solution" => Ok(Self::Solution),
            "discovery" => Ok(Self::Discovery),
            "convention" => Ok(Self::Convention),
            other => Err(Error::validation(format!(
                "unknown memory type '{}' (expected gotcha, decision, solution, discovery or convention)",
                other
            ))),
        }
    }
}

/// How a note relates to a project file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    #[default]
    Related,
    CausedBy,
    Fixes,
}

impl RelationType {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Related => "related",
            Self::CausedBy => "caused_by",
            Self::Fixes => "fixes",
        }
    }
}

/// Sort order for note listings. Every order is descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Relevance,
    Created,
    Updated,
}

// ─────────────────────────────────────────────────────────────────────────────
// Entity Types
// ─────────────────────────────────────────────────────────────────────────────

/// A memory note: the canonical entity persisted as one markdown file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// UUIDv7; empty for hand-written files that never went through `create`.
    pub id: String,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Path relative to the vault root, e.g. `gotchas/esm-imports.md`.
    pub file_path: String,
    pub summary: String,
    pub content: String,
    pub tags: Vec<String>,
    pub relevance: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source_agent: Option<String>,
    pub source_session: Option<String>,
    pub related_files: Vec<String>,
    pub access_count: u32,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl Note {
    /// Timestamp decay is measured from: last access, else creation.
    pub fn last_touched(&self) -> DateTime<Utc> {
        self.last_accessed.unwrap_or(self.created_at)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Input Types
// ─────────────────────────────────────────────────────────────────────────────

/// Input for creating a new note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteInput {
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub summary: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub related_files: Vec<String>,
    pub source_agent: Option<String>,
    pub source_session: Option<String>,
}

impl CreateNoteInput {
    /// Minimal input; tags, related files and source labels start empty.
    pub fn new(memory_type: MemoryType, summary: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            memory_type,
            summary: summary.into(),
            content: content.into(),
            tags: Vec::new(),
            related_files: Vec::new(),
            source_agent: None,
            source_session: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_related_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source(mut self, agent: Option<String>, session: Option<String>) -> Self {
        self.source_agent = agent;
        self.source_session = session;
        self
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateNoteInput {
    pub summary: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub related_files: Option<Vec<String>>,
    pub relevance: Option<f64>,
}

impl UpdateNoteInput {
    /// True when no field would change.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.related_files.is_none()
            && self.relevance.is_none()
    }
}

/// Options for listing notes from the store.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub memory_type: Option<MemoryType>,
    pub sort_by: SortBy,
    pub limit: Option<usize>,
}

/// Clamp a relevance score into `[0, 1]`. NaN collapses to 0.
pub fn clamp_relevance(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
