//! CLI argument definitions using clap derive macros.
//!
//! Command structure for the project memory vault.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use ctxvault_core::{MemoryType, SortBy};

/// Project memory for AI coding assistants
///
/// Notes live as markdown under `.ctx/`; a SQLite index makes them searchable.
#[derive(Parser, Debug)]
#[command(name = "ctx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root holding the `.ctx/` vault
    #[arg(short = 'C', long, global = true, default_value = ".", env = "CTXVAULT_PROJECT")]
    pub project: PathBuf,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the vault in the current project
    Init {
        /// Overwrite an existing config.toml with defaults
        #[arg(short, long)]
        force: bool,
    },

    /// Add a memory
    Add(AddArgs),

    /// Show a memory in full
    Show {
        /// Path inside .ctx (e.g. gotchas/esm-imports.md)
        path: String,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change a memory's fields, or open it in $EDITOR when none are given
    Edit(EditArgs),

    /// Remove a memory
    #[command(alias = "rm")]
    Remove {
        /// Path inside .ctx
        path: String,
    },

    /// List memories
    #[command(alias = "ls")]
    List {
        /// Only this memory type
        #[arg(short, long)]
        r#type: Option<MemoryType>,
        /// Sort order (always descending)
        #[arg(short, long, value_enum, default_value_t = SortField::Relevance)]
        sort: SortField,
        /// Maximum entries
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Full-text search
    #[command(alias = "s")]
    Search {
        /// Search query
        query: String,
        /// Only this memory type
        #[arg(short, long)]
        r#type: Option<MemoryType>,
        /// Maximum results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Count the results as accesses (raises their relevance)
        #[arg(long)]
        touch: bool,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Rebuild the search index from the note files
    Sync,

    /// Apply relevance decay
    Decay(DryRunArgs),

    /// Raise (or lower, with a negative amount) a memory's relevance
    Boost {
        /// Path inside .ctx
        path: String,
        /// Amount added to the relevance
        #[arg(short, long, default_value_t = 0.1, allow_negative_numbers = true)]
        amount: f64,
    },

    /// Lower a memory's relevance by 0.3
    Deprecate {
        /// Path inside .ctx
        path: String,
    },

    /// Merge near-duplicate memories and list low-relevance ones
    Defrag(DryRunArgs),

    /// Extract memories from a transcript (file or stdin)
    Extract(ExtractArgs),

    /// Extract memories from saved session snapshots
    Reflect(DryRunArgs),

    /// Preview the session-start payload
    Inject {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Hook handlers for agent integration (raw markdown on stdout)
    Hook(HookCommand),

    /// Show vault contents and index health
    Status {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Configuration
    Config(ConfigCommand),

    /// Show version
    Version,
}

// ─────────────────────────────────────────────────────────────────────────────
// Note Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Memory type
    pub r#type: MemoryType,

    /// One-line summary
    pub summary: String,

    /// Body text (defaults to the summary)
    #[arg(short, long)]
    pub content: Option<String>,

    /// Comma-separated tags
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Comma-separated related file paths
    #[arg(short, long, value_delimiter = ',')]
    pub related: Vec<String>,

    /// Source agent name
    #[arg(long)]
    pub agent: Option<String>,

    /// Source session ID
    #[arg(long)]
    pub session: Option<String>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Path inside .ctx
    pub path: String,

    /// New summary
    #[arg(long)]
    pub summary: Option<String>,

    /// New body text
    #[arg(short, long)]
    pub content: Option<String>,

    /// Replace tags (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub tags: Option<Vec<String>>,

    /// Replace related file paths (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub related: Option<Vec<String>>,

    /// New relevance (clamped to 0..=1)
    #[arg(long)]
    pub relevance: Option<f64>,
}

/// Sort order for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortField {
    Relevance,
    Created,
    Updated,
}

impl From<SortField> for SortBy {
    fn from(field: SortField) -> Self {
        match field {
            SortField::Relevance => SortBy::Relevance,
            SortField::Created => SortBy::Created,
            SortField::Updated => SortBy::Updated,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct DryRunArgs {
    /// Show what would change without applying it
    #[arg(long)]
    pub dry_run: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Transcript file (`.jsonl` session logs or plain text); stdin when omitted
    pub file: Option<PathBuf>,

    /// Source agent name recorded on created memories
    #[arg(long)]
    pub agent: Option<String>,

    /// Source session ID recorded on created memories
    #[arg(long)]
    pub session: Option<String>,

    /// Create the extracted memories (default is a preview)
    #[arg(short, long)]
    pub save: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Hook Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct HookCommand {
    #[command(subcommand)]
    pub action: HookAction,
}

#[derive(Subcommand, Debug)]
pub enum HookAction {
    /// Print the session-start payload
    SessionStart,

    /// Print memories related to a file about to be edited
    PreEdit {
        /// Project-relative file path
        file: String,
    },

    /// Extract memories from a finished session's transcript
    SessionEnd {
        /// Transcript file
        transcript: PathBuf,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,

    /// Print the config file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::parse_from([
            "ctx", "add", "gotcha", "ESM imports", "--tags", "esm,ts", "--related", "src/index.ts",
        ]);
        match cli.command {
            Commands::Add(args) => {
                assert_eq!(args.r#type, MemoryType::Gotcha);
                assert_eq!(args.tags, vec!["esm", "ts"]);
                assert_eq!(args.related, vec!["src/index.ts"]);
                assert!(args.content.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(Cli::try_parse_from(["ctx", "add", "bogus", "x"]).is_err());
    }

    #[test]
    fn test_parse_negative_boost() {
        let cli = Cli::parse_from(["ctx", "boost", "gotchas/a.md", "--amount", "-0.2"]);
        match cli.command {
            Commands::Boost { amount, .. } => assert_eq!(amount, -0.2),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_project_flag() {
        let cli = Cli::parse_from(["ctx", "status", "-C", "/tmp/project", "--json"]);
        assert_eq!(cli.project, PathBuf::from("/tmp/project"));
        assert!(matches!(cli.command, Commands::Status { json: true }));
    }
}
