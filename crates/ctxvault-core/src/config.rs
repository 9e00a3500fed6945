//! Vault configuration.
//!
//! Loaded from `.ctx/config.toml` (or the file named by `CTXVAULT_CONFIG`).
//! Every field has a default, so a partial file only overrides what it names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::MemoryType;
use crate::vault::VAULT_DIR;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CTXVAULT_CONFIG";

/// Config file name inside the vault directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session-start payload
    pub injection: InjectionConfig,

    /// Per-file context lookups
    pub contextual: ContextualConfig,

    /// Transcript pattern extraction
    pub extract: ExtractConfig,

    /// Relevance decay and archival
    pub decay: DecayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionConfig {
    pub enabled: bool,

    /// Token ceiling for the session payload (100..=2000)
    pub max_tokens: usize,

    /// Memory types eligible for injection
    pub include_types: Vec<MemoryType>,

    /// Notes carrying any of these tags are never injected
    pub exclude_tags: Vec<String>,

    /// Put conventions ahead of everything else
    pub always_include_system: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextualConfig {
    pub enabled: bool,

    /// Token ceiling for a per-file payload (50..=500)
    pub max_tokens: usize,

    /// Memory types considered for a file
    pub types: Vec<MemoryType>,
}

/// How transcripts are mined for memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractMode {
    /// Local regex rules only
    #[default]
    Lightweight,
    /// Hand the transcript to an external extractor
    Deep,
}

impl ExtractMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lightweight => "lightweight",
            Self::Deep => "deep",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub enabled: bool,
    pub mode: ExtractMode,

    /// Sessions shorter than this are not worth mining
    pub min_session_messages: usize,

    /// External extractor for `deep` mode: program followed by its arguments.
    /// It receives the transcript on stdin and prints a JSON array of candidates.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub enabled: bool,

    /// Exponential decay rate per day (0..=1)
    pub lambda: f64,

    /// Notes below this relevance are reported as archived
    pub archive_threshold: f64,

    /// Archived notes below this relevance (and old enough) are deletion candidates
    pub delete_threshold: f64,

    /// Minimum age in days before deletion is suggested
    pub delete_min_age_days: f64,

    /// Types whose relevance never decays
    pub pinned_types: Vec<MemoryType>,
}

// Default value functions
fn default_contextual_types() -> Vec<MemoryType> {
    vec![MemoryType::Gotcha, MemoryType::Solution]
}

fn default_pinned_types() -> Vec<MemoryType> {
    vec![MemoryType::Convention]
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tokens: 500,
            include_types: MemoryType::ALL.to_vec(),
            exclude_tags: Vec::new(),
            always_include_system: true,
        }
    }
}

impl Default for ContextualConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tokens: 200,
            types: default_contextual_types(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: ExtractMode::default(),
            min_session_messages: 5,
            command: Vec::new(),
        }
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lambda: 0.01,
            archive_threshold: 0.2,
            delete_threshold: 0.05,
            delete_min_age_days: 90.0,
            pinned_types: default_pinned_types(),
        }
    }
}

impl Config {
    /// Config file location for a project: `CTXVAULT_CONFIG` if set, else
    /// `<project>/.ctx/config.toml`.
    pub fn config_path(project_root: &Path) -> PathBuf {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => project_root.join(VAULT_DIR).join(CONFIG_FILE),
        }
    }

    /// Load the project's configuration. A missing file yields defaults.
    pub fn load(project_root: &Path) -> Result<Self> {
        Self::load_from(&Self::config_path(project_root))
    }

    /// Load configuration from an explicit file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        check_range("injection.max_tokens", self.injection.max_tokens, 100, 2000)?;
        check_range("contextual.max_tokens", self.contextual.max_tokens, 50, 500)?;

        let decay = &self.decay;
        if !(0.0..=1.0).contains(&decay.lambda) {
            return Err(Error::Config(format!(
                "decay.lambda must be between 0 and 1 (got {})",
                decay.lambda
            )));
        }
        for (name, value) in [
            ("decay.archive_threshold", decay.archive_threshold),
            ("decay.delete_threshold", decay.delete_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!("{} must be between 0 and 1 (got {})", name, value)));
            }
        }
        if decay.delete_threshold > decay.archive_threshold {
            return Err(Error::Config(
                "decay.delete_threshold must not exceed decay.archive_threshold".to_string(),
            ));
        }
        if decay.delete_min_age_days.is_nan() || decay.delete_min_age_days < 0.0 {
            return Err(Error::Config("decay.delete_min_age_days must not be negative".to_string()));
        }
        Ok(())
    }
}

fn check_range(name: &str, value: usize, min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "{} must be between {} and {} (got {})",
            name, min, max, value
        )))
    }
}
