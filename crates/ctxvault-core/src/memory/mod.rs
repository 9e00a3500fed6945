//! Note store: the canonical, file-based home of every memory.
//!
//! Each note is one markdown file with a TOML metadata block, filed under a
//! directory named after its type:
//!
//! ```text
//! .ctx/
//! ├── gotchas/        gotcha
//! ├── decisions/      decision
//! ├── solutions/      solution
//! ├── discoveries/    discovery
//! └── system/         convention
//! ```
//!
//! The search index is derived from these files and can always be rebuilt
//! from them.

mod frontmatter;
mod slug;
mod store;
mod validation;

pub use frontmatter::{parse_note, serialize_note};
pub use slug::slugify;
pub use store::{new_note_id, path_note_id, tally_by_type, NoteStore};
pub use validation::{validate_create, validate_summary, MAX_SUMMARY_LEN};
