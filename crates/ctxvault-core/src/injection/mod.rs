//! Token-budgeted payloads for agent context.
//!
//! Two entry points share one budgeting rule: walk an ordered list of
//! rendered notes and keep the longest prefix that fits the ceiling.
//!
//! - [`build_session_payload`]: everything worth knowing at session start
//! - [`context_for_file`]: short bullets for the file about to be edited

mod budget;
mod file_context;
mod session;

pub use budget::{count_tokens, fit_within_budget, Budgeted};
pub use file_context::{context_for_file, format_file_note, FileContext, FILE_CONTEXT_LIMIT};
pub use session::{build_session_payload, format_session_note, Payload, SESSION_HEADER};
