//! Mining transcripts for memory candidates.
//!
//! The lightweight path runs a fixed set of regex rules over the text and
//! drops candidates the index already holds. A `deep` extractor can be
//! plugged in behind [`TranscriptExtractor`].

mod dedup;
mod extractor;
mod patterns;
mod transcript;

pub use dedup::{deduplicate_patterns, DEFAULT_DEDUP_THRESHOLD};
pub use extractor::{
    extract_from_transcript, extract_with, parse_candidates, CommandExtractor, ExtractOptions,
    ExtractionReport, PatternExtractor, TranscriptExtractor, DEEP_TRANSCRIPT_CHARS,
};
pub use patterns::{detect_patterns, PatternMatch, PATTERN_CONFIDENCE};
pub use transcript::{parse_jsonl_transcript, TranscriptMessage, TranscriptSession, TRANSCRIPT_AGENT};
