//! Drop candidates that the index already knows about.

use tracing::{debug, warn};

use crate::index::{build_disjunctive_query, SearchIndex};

use super::patterns::PatternMatch;

/// Same-type matches at or above this count make a candidate a duplicate.
pub const DEFAULT_DEDUP_THRESHOLD: usize = 1;

/// Leading summary words used for the duplicate lookup.
const DEDUP_QUERY_WORDS: usize = 5;

/// Keep only candidates with fewer than `threshold` same-type matches in
/// the index. Candidates that cannot be checked are kept.
pub fn deduplicate_patterns(
    index: &SearchIndex,
    patterns: Vec<PatternMatch>,
    threshold: usize,
) -> Vec<PatternMatch> {
    patterns
        .into_iter()
        .filter(|pattern| {
            let Some(query) = build_disjunctive_query(&pattern.summary, DEDUP_QUERY_WORDS) else {
                return true;
            };
            match index.match_count(&query, pattern.memory_type) {
                Ok(count) if count >= threshold => {
                    debug!("Dropping duplicate candidate '{}'", pattern.summary);
                    false
                }
                Ok(_) => true,
                Err(e) => {
                    warn!("Could not check '{}' for duplicates: {}", pattern.summary, e);
                    true
                }
            }
        })
        .collect()
}
