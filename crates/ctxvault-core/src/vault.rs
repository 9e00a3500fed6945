//! A project's vault: the note store and its search index, opened together.
//!
//! `Vault` is what the CLI and hook handlers talk to. Every write goes to the
//! note files first and is then mirrored into the index, so a crash in
//! between leaves at worst a stale index that [`Vault::rebuild`] repairs.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, ExtractMode};
use crate::error::{Error, Result};
use crate::extraction::{
    extract_with, parse_jsonl_transcript, CommandExtractor, ExtractOptions, ExtractionReport,
    PatternExtractor, TranscriptExtractor, TRANSCRIPT_AGENT,
};
use crate::index::{SearchHit, SearchIndex, SearchOptions};
use crate::injection::{build_session_payload, context_for_file, FileContext, Payload};
use crate::intelligence::{
    apply_decay, boost_relevance, defrag, deprecate, reflect_on_sessions, DecayReport, DefragOptions,
    DefragReport, ReflectOptions, ReflectReport, SESSIONS_DIR,
};
use crate::memory::{tally_by_type, NoteStore};
use crate::types::{CreateNoteInput, ListOptions, MemoryType, Note, UpdateNoteInput};

/// Vault directory under the project root.
pub const VAULT_DIR: &str = ".ctx";

/// Search index file inside the vault directory.
pub const INDEX_FILE: &str = "vault.db";

/// Relevance added when a note is surfaced to an agent.
pub const ACCESS_BOOST: f64 = 0.05;

const VAULT_GITIGNORE: &str = "vault.db\nvault.db-wal\nvault.db-shm\nsessions/\n";

/// Options for [`Vault::extract`].
#[derive(Debug, Clone, Default)]
pub struct ExtractRequest {
    pub source_agent: Option<String>,
    pub source_session: Option<String>,
    /// Messages in the session, when known; short sessions are skipped
    pub message_count: Option<usize>,
    /// Create notes for the surviving candidates
    pub save: bool,
}

/// Result of [`Vault::extract`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractOutcome {
    /// Extractor that produced the candidates
    pub extractor: String,
    #[serde(flatten)]
    pub report: ExtractionReport,
    /// Notes created (empty unless saving)
    pub created_paths: Vec<String>,
}

/// Snapshot of a vault's contents and index health.
#[derive(Debug, Clone, Serialize)]
pub struct VaultStatus {
    pub root: PathBuf,
    pub config_file: Option<PathBuf>,
    pub total: usize,
    pub by_type: BTreeMap<MemoryType, usize>,
    pub indexed: usize,
    /// Note files the index does not know about
    pub missing_from_index: Vec<String>,
    /// Index rows whose note file is gone
    pub stale_in_index: Vec<String>,
}

impl VaultStatus {
    /// True when the index mirrors the note files exactly.
    pub fn in_sync(&self) -> bool {
        self.missing_from_index.is_empty() && self.stale_in_index.is_empty()
    }
}

/// Note store, search index and configuration of one project.
pub struct Vault {
    project_root: PathBuf,
    root: PathBuf,
    config: Config,
    store: NoteStore,
    index: SearchIndex,
}

impl Vault {
    /// `<project_root>/.ctx`.
    pub fn dir(project_root: &Path) -> PathBuf {
        project_root.join(VAULT_DIR)
    }

    /// Whether `project_root` already has a vault.
    pub fn exists(project_root: &Path) -> bool {
        Self::dir(project_root).is_dir()
    }

    /// Open an existing vault.
    pub fn open(project_root: impl AsRef<Path>) -> Result<Self> {
        let project_root = project_root.as_ref();
        let root = Self::dir(project_root);
        if !root.is_dir() {
            return Err(Error::NotInitialized(root));
        }
        let config = Config::load(project_root)?;
        Self::open_with(project_root, config)
    }

    /// Create the vault layout (type directories, `sessions/`, `.gitignore`,
    /// default `config.toml`) and open it. Existing notes are kept; an
    /// existing config is only replaced with `force`.
    pub fn init(project_root: impl AsRef<Path>, force: bool) -> Result<Self> {
        let project_root = project_root.as_ref();
        let root = Self::dir(project_root);

        let store = NoteStore::new(&root);
        store.ensure_layout()?;
        fs::create_dir_all(root.join(SESSIONS_DIR))?;

        let gitignore = root.join(".gitignore");
        if !gitignore.exists() {
            fs::write(&gitignore, VAULT_GITIGNORE)?;
        }

        let config_path = Config::config_path(project_root);
        let config = if force || !config_path.exists() {
            let config = Config::default();
            config.save(&config_path)?;
            info!("Wrote default config to {}", config_path.display());
            config
        } else {
            Config::load_from(&config_path)?
        };

        Self::open_with(project_root, config)
    }

    /// Open with an explicit configuration.
    pub fn open_with(project_root: impl AsRef<Path>, config: Config) -> Result<Self> {
        let project_root = project_root.as_ref().to_path_buf();
        let root = Self::dir(&project_root);
        let index = SearchIndex::open(root.join(INDEX_FILE))?;
        Ok(Self {
            store: NoteStore::new(&root),
            project_root,
            root,
            config,
            index,
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notes
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a note and index it.
    pub fn add(&self, input: CreateNoteInput) -> Result<Note> {
        let note = self.store.create(input)?;
        self.index.sync(&note)?;
        info!("Added {} {}", note.memory_type, note.file_path);
        Ok(note)
    }

    /// Update a note and re-index it. `None` if there is no such note.
    pub fn edit(&self, file_path: &str, changes: UpdateNoteInput) -> Result<Option<Note>> {
        let Some(note) = self.store.update(file_path, changes)? else {
            return Ok(None);
        };
        self.index.sync(&note)?;
        Ok(Some(note))
    }

    /// Re-index one note file after it was changed by hand. A file that is
    /// gone is dropped from the index.
    pub fn resync(&self, file_path: &str) -> Result<Option<Note>> {
        match self.store.read(file_path)? {
            Some(note) => {
                self.index.sync(&note)?;
                Ok(Some(note))
            }
            None => {
                self.index.remove(file_path)?;
                Ok(None)
            }
        }
    }

    /// Delete a note from disk and index. Returns whether anything existed.
    pub fn remove(&self, file_path: &str) -> Result<bool> {
        let deleted = self.store.delete(file_path)?;
        let rows = self.index.remove(file_path)?;
        Ok(deleted || rows > 0)
    }

    pub fn show(&self, file_path: &str) -> Result<Option<Note>> {
        self.store.read(file_path)
    }

    pub fn list(&self, options: &ListOptions) -> Result<Vec<Note>> {
        self.store.list(options)
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchHit>> {
        self.index.search(query, options)
    }

    /// Count an access on each note and raise its relevance by
    /// [`ACCESS_BOOST`]. Unknown paths are ignored.
    pub fn record_hits<'a, I>(&self, file_paths: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut touched = 0;
        for file_path in file_paths {
            if boost_relevance(&self.index, &self.store, file_path, ACCESS_BOOST)?.is_some() {
                touched += 1;
            }
        }
        Ok(touched)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Index & lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Rebuild the index from the note files.
    pub fn rebuild(&self) -> Result<usize> {
        self.index.rebuild(&self.store)
    }

    pub fn decay(&self, dry_run: bool) -> Result<DecayReport> {
        apply_decay(&self.index, &self.store, &self.config.decay, dry_run)
    }

    pub fn boost(&self, file_path: &str, amount: f64) -> Result<Option<f64>> {
        boost_relevance(&self.index, &self.store, file_path, amount)
    }

    pub fn deprecate(&self, file_path: &str) -> Result<Option<f64>> {
        deprecate(&self.index, &self.store, file_path)
    }

    pub fn defrag(&self, dry_run: bool) -> Result<DefragReport> {
        defrag(&self.store, &self.index, &self.config.decay, DefragOptions { dry_run })
    }

    pub fn reflect(&self, dry_run: bool) -> Result<ReflectReport> {
        reflect_on_sessions(
            &self.store,
            &self.index,
            &self.config,
            ReflectOptions {
                dry_run,
                ..Default::default()
            },
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Extraction
    // ─────────────────────────────────────────────────────────────────────────

    /// Extractor selected by `extract.mode`. Deep mode without a configured
    /// command falls back to the built-in rules.
    pub fn extractor(&self) -> Box<dyn TranscriptExtractor> {
        match self.config.extract.mode {
            ExtractMode::Lightweight => Box::new(PatternExtractor),
            ExtractMode::Deep => match CommandExtractor::from_argv(&self.config.extract.command) {
                Some(command) => Box::new(command),
                None => {
                    warn!("extract.mode is deep but extract.command is empty; using pattern rules");
                    Box::new(PatternExtractor)
                }
            },
        }
    }

    /// Mine a transcript for memories, deduplicated against the index.
    pub fn extract(&self, transcript: &str, request: ExtractRequest) -> Result<ExtractOutcome> {
        let extractor = self.extractor();
        let report = extract_with(
            extractor.as_ref(),
            transcript,
            &self.config.extract,
            ExtractOptions {
                source_agent: request.source_agent,
                source_session: request.source_session,
                index: Some(&self.index),
                message_count: request.message_count,
            },
        );

        let mut created_paths = Vec::new();
        if request.save {
            for input in &report.memories {
                created_paths.push(self.add(input.clone())?.file_path);
            }
        }

        Ok(ExtractOutcome {
            extractor: extractor.name().to_string(),
            report,
            created_paths,
        })
    }

    /// Mine a transcript file. `.jsonl` files are read as agent session
    /// logs (one event per line); anything else as plain text.
    pub fn extract_file(&self, path: &Path, mut request: ExtractRequest) -> Result<ExtractOutcome> {
        let raw = fs::read_to_string(path)?;
        let is_jsonl = path.extension().and_then(|e| e.to_str()) == Some("jsonl");
        if !is_jsonl {
            return self.extract(&raw, request);
        }

        let fallback_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let Some(session) = parse_jsonl_transcript(&raw, &fallback_id) else {
            debug!("No messages in {}", path.display());
            return Ok(ExtractOutcome::default());
        };

        request.source_agent.get_or_insert_with(|| TRANSCRIPT_AGENT.to_string());
        request.source_session.get_or_insert_with(|| session.session_id.clone());
        request.message_count.get_or_insert(session.messages.len());
        self.extract(&session.to_text(), request)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Injection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn session_payload(&self) -> Result<Payload> {
        build_session_payload(&self.store, &self.config.injection)
    }

    pub fn file_context(&self, file_path: &str) -> Result<FileContext> {
        context_for_file(&self.index, &self.config.contextual, file_path)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Status
    // ─────────────────────────────────────────────────────────────────────────

    pub fn status(&self) -> Result<VaultStatus> {
        let notes = self.store.list(&ListOptions::default())?;
        let indexed = self.index.all()?;

        let on_disk: BTreeSet<&str> = notes.iter().map(|n| n.file_path.as_str()).collect();
        let in_index: BTreeSet<&str> = indexed.iter().map(|n| n.file_path.as_str()).collect();

        let config_path = Config::config_path(&self.project_root);
        Ok(VaultStatus {
            root: self.root.clone(),
            config_file: config_path.exists().then_some(config_path),
            total: notes.len(),
            by_type: tally_by_type(&notes),
            indexed: indexed.len(),
            missing_from_index: on_disk.difference(&in_index).map(|p| p.to_string()).collect(),
            stale_in_index: in_index.difference(&on_disk).map(|p| p.to_string()).collect(),
        })
    }
}
