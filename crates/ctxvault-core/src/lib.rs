//! ctxvault-core - Memory engine for ctxvault
//!
//! Project memory for AI coding assistants: short structured notes kept as
//! markdown files under `.ctx/`, a derived full-text index over them, and
//! token-budgeted payloads built from both.
//!
//! - **memory**: Note files (create, read, update, delete, list)
//! - **index**: SQLite FTS5 index, rebuildable from the note files
//! - **intelligence**: Relevance decay, boosting, duplicate merging, reflection
//! - **extraction**: Memory candidates mined from session transcripts
//! - **injection**: Token-budgeted session and per-file payloads
//! - **vault**: Store, index and config of one project, opened together
//!
//! The note files are the ground truth; the index can always be rebuilt
//! from them.

pub mod config;
pub mod error;
pub mod extraction;
pub mod index;
pub mod injection;
pub mod intelligence;
pub mod memory;
pub mod time;
pub mod types;
pub mod vault;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use index::SearchIndex;
pub use memory::NoteStore;
pub use types::{CreateNoteInput, ListOptions, MemoryType, Note, SortBy, UpdateNoteInput};
pub use vault::Vault;
