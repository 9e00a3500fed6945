//! Turning transcripts into note creation requests.

use std::io::Write;
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use crate::index::SearchIndex;
use crate::types::CreateNoteInput;

use super::dedup::{deduplicate_patterns, DEFAULT_DEDUP_THRESHOLD};
use super::patterns::{detect_patterns, PatternMatch, MAX_CANDIDATE_SUMMARY};

/// Characters of transcript handed to an external extractor.
pub const DEEP_TRANSCRIPT_CHARS: usize = 8000;

/// Source of memory candidates.
///
/// Implementations are synchronous; anything remote or slow hides behind
/// this call. A failing extractor yields no candidates, it never fails the
/// extraction as a whole.
pub trait TranscriptExtractor {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Find candidates in a transcript.
    fn extract(&self, transcript: &str) -> Result<Vec<PatternMatch>>;
}

/// The built-in regex rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl TranscriptExtractor for PatternExtractor {
    fn name(&self) -> &str {
        "patterns"
    }

    fn extract(&self, transcript: &str) -> Result<Vec<PatternMatch>> {
        Ok(detect_patterns(transcript))
    }
}

/// Runs an external program that reads the transcript on stdin and prints a
/// JSON array of candidates (`type`, `summary`, `content`, `tags`,
/// `confidence`) on stdout.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    /// Build from an argv list; `None` if it is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl TranscriptExtractor for CommandExtractor {
    fn name(&self) -> &str {
        &self.program
    }

    fn extract(&self, transcript: &str) -> Result<Vec<PatternMatch>> {
        let input: String = transcript.chars().take(DEEP_TRANSCRIPT_CHARS).collect();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
        }
        let output = child.wait_with_output()?;

        if !output.status.success() {
            return Err(Error::Io(std::io::Error::other(format!(
                "extractor '{}' exited with {}",
                self.program, output.status
            ))));
        }
        parse_candidates(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse an extractor's JSON output, tolerating a surrounding code fence.
/// Entries that do not have the expected shape are dropped.
pub fn parse_candidates(raw: &str) -> Result<Vec<PatternMatch>> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed);

    let values: Vec<serde_json::Value> = serde_json::from_str(body.trim())?;
    Ok(values
        .into_iter()
        .filter_map(|value| serde_json::from_value::<PatternMatch>(value).ok())
        .filter_map(|mut candidate| {
            candidate.summary = candidate.summary.trim().chars().take(MAX_CANDIDATE_SUMMARY).collect();
            candidate.content = candidate.content.trim().to_string();
            candidate.confidence = candidate.confidence.clamp(0.0, 1.0);
            if candidate.summary.is_empty() || candidate.summary.contains('\n') || candidate.content.is_empty() {
                None
            } else {
                Some(candidate)
            }
        })
        .collect())
}

/// Options for [`extract_from_transcript`].
#[derive(Default)]
pub struct ExtractOptions<'a> {
    pub source_agent: Option<String>,
    pub source_session: Option<String>,
    /// Deduplicate against this index when given
    pub index: Option<&'a SearchIndex>,
    /// Number of messages in the session, when known
    pub message_count: Option<usize>,
}

/// Outcome of an extraction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    /// Creation requests for the candidates that survived deduplication
    pub memories: Vec<CreateNoteInput>,
    /// Every candidate found, before deduplication
    pub raw: Vec<PatternMatch>,
    /// Number of candidates dropped as duplicates
    pub deduplicated: usize,
}

/// Extract with the built-in regex rules.
pub fn extract_from_transcript(
    transcript: &str,
    config: &ExtractConfig,
    options: ExtractOptions<'_>,
) -> ExtractionReport {
    extract_with(&PatternExtractor, transcript, config, options)
}

/// Extract with any [`TranscriptExtractor`].
///
/// Nothing is written; the caller decides whether to create the returned
/// notes.
pub fn extract_with(
    extractor: &dyn TranscriptExtractor,
    transcript: &str,
    config: &ExtractConfig,
    options: ExtractOptions<'_>,
) -> ExtractionReport {
    if !config.enabled {
        return ExtractionReport::default();
    }
    if let Some(count) = options.message_count {
        if count < config.min_session_messages {
            debug!(
                "Session has {} messages, fewer than {}; skipping extraction",
                count, config.min_session_messages
            );
            return ExtractionReport::default();
        }
    }

    let raw = match extractor.extract(transcript) {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!("Extractor '{}' failed: {}", extractor.name(), e);
            Vec::new()
        }
    };

    let unique = match options.index {
        Some(index) => deduplicate_patterns(index, raw.clone(), DEFAULT_DEDUP_THRESHOLD),
        None => raw.clone(),
    };
    let deduplicated = raw.len() - unique.len();

    let memories = unique
        .iter()
        .map(|p| p.to_input(options.source_agent.clone(), options.source_session.clone()))
        .collect();

    info!(
        "Extractor '{}' found {} candidates ({} duplicates)",
        extractor.name(),
        raw.len(),
        deduplicated
    );
    ExtractionReport {
        memories,
        raw,
        deduplicated,
    }
}
