//! Regex rules that spot memory-worthy sentences in free text.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::{CreateNoteInput, MemoryType};

/// Confidence assigned to every rule-based candidate.
pub const PATTERN_CONFIDENCE: f64 = 0.6;

/// Candidates whose sentence is shorter than this (in characters) are dropped.
pub const MIN_SENTENCE_LEN: usize = 10;

/// Summaries are cut to this many characters.
pub const MAX_CANDIDATE_SUMMARY: usize = 120;

/// A memory candidate found in a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    pub summary: String,
    pub content: String,
    pub tags: Vec<String>,
    pub confidence: f64,
}

impl PatternMatch {
    /// Turn the candidate into a note creation request.
    pub fn to_input(&self, source_agent: Option<String>, source_session: Option<String>) -> CreateNoteInput {
        CreateNoteInput::new(self.memory_type, self.summary.clone(), self.content.clone())
            .with_tags(self.tags.iter().cloned())
            .with_source(source_agent, source_session)
    }
}

struct Rule {
    memory_type: MemoryType,
    regex: Regex,
}

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (
                MemoryType::Gotcha,
                r"(?i)(?:gotcha|watch\s+out|careful|beware|pitfall|trap|caveat|don'?t\s+(?:use|forget|do))\b",
            ),
            (
                MemoryType::Decision,
                r"(?i)(?:decided?\s+(?:to|on)|we\s+chose|approach\s*:|decision\s*:)",
            ),
            (
                MemoryType::Solution,
                r"(?i)(?:fix(?:ed)?\s*:|solv(?:ed|tion)\s*(?:by|:)|workaround\s*:)",
            ),
            (
                MemoryType::Discovery,
                r"(?i)(?:found\s+(?:that|out)|discover(?:ed|y)|turns?\s+out|TIL\b)",
            ),
        ]
        .into_iter()
        .map(|(memory_type, pattern)| Rule {
            memory_type,
            regex: Regex::new(pattern).expect("pattern rules are valid regexes"),
        })
        .collect()
    })
}

/// Find at most one candidate per rule in `text`.
///
/// The candidate is the sentence around the rule's first match: from just
/// after the previous `.` up to and including the next one.
pub fn detect_patterns(text: &str) -> Vec<PatternMatch> {
    rules()
        .iter()
        .filter_map(|rule| {
            let found = rule.regex.find(text)?;
            let start = text[..found.start()].rfind('.').map(|i| i + 1).unwrap_or(0);
            let end = text[found.end()..]
                .find('.')
                .map(|i| found.end() + i + 1)
                .unwrap_or(text.len());
            let sentence = text[start..end].trim();

            if sentence.chars().count() < MIN_SENTENCE_LEN {
                return None;
            }

            Some(PatternMatch {
                memory_type: rule.memory_type,
                summary: single_line(sentence).chars().take(MAX_CANDIDATE_SUMMARY).collect(),
                content: sentence.to_string(),
                tags: vec![rule.memory_type.as_str().to_string()],
                confidence: PATTERN_CONFIDENCE,
            })
        })
        .collect()
}

/// Collapse runs of whitespace (newlines included) into single spaces.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gotcha_sentence() {
        let matches = detect_patterns("Watch out for circular imports when using barrel files.");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].memory_type, MemoryType::Gotcha);
        assert_eq!(matches[0].summary, "Watch out for circular imports when using barrel files.");
        assert_eq!(matches[0].content, matches[0].summary);
        assert_eq!(matches[0].tags, vec!["gotcha"]);
        assert_eq!(matches[0].confidence, PATTERN_CONFIDENCE);
    }

    #[test]
    fn test_sentence_boundaries() {
        let text = "We set up the repo. Then we decided to use pnpm for installs. It went fine.";
        let matches = detect_patterns(text);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].memory_type, MemoryType::Decision);
        assert_eq!(matches[0].content, "Then we decided to use pnpm for installs.");
    }

    #[test]
    fn test_each_rule_fires_once() {
        let text = "Careful with the cache. Fix: clear node_modules. Turns out the lockfile was stale. \
                    Careful with the other cache too. Decision: keep npm for now.";
        let matches = detect_patterns(text);
        let types: Vec<MemoryType> = matches.iter().map(|m| m.memory_type).collect();
        assert_eq!(
            types,
            vec![MemoryType::Gotcha, MemoryType::Decision, MemoryType::Solution, MemoryType::Discovery]
        );
        assert_eq!(matches[0].content, "Careful with the cache.");
    }

    #[test]
    fn test_case_insensitive_and_unterminated() {
        let matches = detect_patterns("til the build cache lives in target");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].memory_type, MemoryType::Discovery);
        assert_eq!(matches[0].content, "til the build cache lives in target");
    }

    #[test]
    fn test_short_sentences_dropped() {
        assert!(detect_patterns("Beware.").is_empty());
        assert!(detect_patterns("Nothing interesting happened here.").is_empty());
    }

    #[test]
    fn test_summary_truncated() {
        let text = format!("Watch out for {}.", "very ".repeat(50));
        let matches = detect_patterns(&text);
        assert_eq!(matches[0].summary.chars().count(), MAX_CANDIDATE_SUMMARY);
        assert_eq!(matches[0].content, text);
    }

    #[test]
    fn test_multiline_sentence_gives_single_line_summary() {
        let matches = detect_patterns("## Notes\n\nWe decided to\nuse pnpm.");
        assert_eq!(matches[0].summary, "## Notes We decided to use pnpm.");
        assert_eq!(matches[0].content, "## Notes\n\nWe decided to\nuse pnpm.");
    }

    #[test]
    fn test_to_input() {
        let matches = detect_patterns("Don't use moment.js in new code, it is deprecated.");
        let input = matches[0].to_input(Some("claude".to_string()), None);
        assert_eq!(input.memory_type, MemoryType::Gotcha);
        assert_eq!(input.tags, vec!["gotcha"]);
        assert_eq!(input.source_agent.as_deref(), Some("claude"));
    }
}
