//! Error types for ctxvault-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using ctxvault-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for memory engine operations.
///
/// Missing notes are not errors: lookups return `Ok(None)` / `Ok(false)` and
/// the caller decides how to report the absence.
#[derive(Error, Debug)]
pub enum Error {
    // Input errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No vault at {0:?} (run `ctx init` first)")]
    NotInitialized(PathBuf),

    // Note file errors
    #[error("Malformed note file {path:?}: {message}")]
    Frontmatter { path: PathBuf, message: String },

    // Index errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Full-text query rejected by FTS5 (bad syntax, stray operators).
    /// Search and dedup recover from this locally.
    #[error("Index query error: {0}")]
    IndexQuery(String),

    // Injection errors
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed-note error for a file
    pub fn frontmatter(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Frontmatter {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
