//! Vault defragmentation: merge near-duplicate notes and list stale ones.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DecayConfig;
use crate::error::{Error, Result};
use crate::index::{build_disjunctive_query, SearchIndex};
use crate::memory::NoteStore;

/// Minimum summary word overlap for two notes to count as duplicates.
pub const MERGE_OVERLAP: f64 = 0.6;

/// Leading summary words used to look for similar notes.
pub const SIMILARITY_QUERY_WORDS: usize = 5;

/// Options for [`defrag`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefragOptions {
    /// Report what would happen without changing anything
    pub dry_run: bool,
}

/// Outcome of a defrag pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DefragReport {
    /// Number of notes merged away
    pub merged: usize,
    /// Paths of the merged-away notes
    pub merged_paths: Vec<String>,
    /// Notes below the archive threshold
    pub archived: Vec<String>,
    /// Notes remaining after the merge
    pub total_memories: usize,
}

/// Merge near-duplicates and report low-relevance notes.
///
/// Notes are visited from most to least relevant. Of two same-type notes
/// whose summaries share at least 60% of their words, the more relevant one
/// survives; the other is deleted from the index (all merges in one
/// transaction) and then from the store. A real run that merged anything
/// finishes with a full index rebuild.
pub fn defrag(
    store: &NoteStore,
    index: &SearchIndex,
    config: &DecayConfig,
    options: DefragOptions,
) -> Result<DefragReport> {
    let notes = index.all()?;
    let mut visited: HashSet<String> = HashSet::new();
    let mut merged: HashSet<String> = HashSet::new();
    let mut merges: Vec<(String, String)> = Vec::new();

    for survivor in &notes {
        if merged.contains(&survivor.id) {
            continue;
        }
        visited.insert(survivor.id.clone());
        let Some(query) = build_disjunctive_query(&survivor.summary, SIMILARITY_QUERY_WORDS) else {
            continue;
        };

        let similar = match index.similar(&query, survivor.memory_type, &survivor.id) {
            Ok(similar) => similar,
            Err(Error::IndexQuery(message)) => {
                warn!("Skipping duplicate check for {}: {}", survivor.file_path, message);
                continue;
            }
            Err(e) => return Err(e),
        };

        for candidate in similar {
            if merged.contains(&candidate.id) {
                continue;
            }
            if word_overlap(&survivor.summary, &candidate.summary) < MERGE_OVERLAP {
                continue;
            }

            // A note seen earlier ranks at least as high as this one.
            if visited.contains(&candidate.id) || candidate.relevance > survivor.relevance {
                debug!("Merging {} into {}", survivor.file_path, candidate.file_path);
                merged.insert(survivor.id.clone());
                merges.push((survivor.id.clone(), survivor.file_path.clone()));
                break;
            }

            debug!("Merging {} into {}", candidate.file_path, survivor.file_path);
            merged.insert(candidate.id.clone());
            merges.push((candidate.id, candidate.file_path));
        }
    }

    if !options.dry_run && !merges.is_empty() {
        let ids: Vec<String> = merges.iter().map(|(id, _)| id.clone()).collect();
        index.remove_by_ids(&ids)?;
        for (_, file_path) in &merges {
            store.delete(file_path)?;
        }
        index.rebuild(store)?;
    }

    let report = DefragReport {
        merged: merges.len(),
        archived: notes
            .iter()
            .filter(|n| n.relevance < config.archive_threshold && !merged.contains(&n.id))
            .map(|n| n.file_path.clone())
            .collect(),
        total_memories: notes.len() - merges.len(),
        merged_paths: merges.into_iter().map(|(_, file_path)| file_path).collect(),
    };

    info!(
        "Defrag merged {} notes, {} below archive threshold, {} remaining",
        report.merged,
        report.archived.len(),
        report.total_memories
    );
    Ok(report)
}

/// |a ∩ b| / min(|a|, |b|) over lowercase whitespace-separated words.
pub fn word_overlap(a: &str, b: &str) -> f64 {
    let words_a: HashSet<String> = a.split_whitespace().map(str::to_lowercase).collect();
    let words_b: HashSet<String> = b.split_whitespace().map(str::to_lowercase).collect();

    let smaller = words_a.len().min(words_b.len());
    if smaller == 0 {
        return 0.0;
    }
    let shared = words_a.intersection(&words_b).count();
    shared as f64 / smaller as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CreateNoteInput, ListOptions, MemoryType};
    use tempfile::{tempdir, TempDir};

    fn setup() -> (TempDir, NoteStore, SearchIndex) {
        let temp = tempdir().expect("Failed to create temp dir");
        let store = NoteStore::new(temp.path());
        let index = SearchIndex::open_in_memory().unwrap();
        (temp, store, index)
    }

    fn add(store: &NoteStore, index: &SearchIndex, memory_type: MemoryType, summary: &str) {
        let note = store
            .create(CreateNoteInput::new(memory_type, summary, format!("{} in detail.", summary)))
            .unwrap();
        index.sync(&note).unwrap();
    }

    fn add_ranked(store: &NoteStore, index: &SearchIndex, summary: &str, relevance: f64) -> String {
        let note = store
            .create(CreateNoteInput::new(MemoryType::Gotcha, summary, format!("{} in detail.", summary)))
            .unwrap();
        let note = store.set_relevance(&note.file_path, relevance).unwrap().unwrap();
        index.sync(&note).unwrap();
        note.file_path
    }

    fn store_count(store: &NoteStore) -> usize {
        store.list(&ListOptions::default()).unwrap().len()
    }

    #[test]
    fn test_word_overlap() {
        assert_eq!(word_overlap("a b c", "A B C"), 1.0);
        assert_eq!(word_overlap("a b", "a b c d"), 1.0);
        assert!((word_overlap("a b c d e", "a b x y z") - 0.4).abs() < 1e-9);
        assert_eq!(word_overlap("", "a"), 0.0);
    }

    #[test]
    fn test_dry_run_changes_nothing() {
        let (_temp, store, index) = setup();
        for i in 1..=3 {
            add(&store, &index, MemoryType::Gotcha, &format!("React useEffect infinite loop variant {}", i));
        }

        let before = store_count(&store);
        let report = defrag(&store, &index, &DecayConfig::default(), DefragOptions { dry_run: true }).unwrap();

        assert_eq!(report.merged, 2);
        assert_eq!(report.total_memories, 1);
        assert_eq!(store_count(&store), before);
        assert_eq!(index.count().unwrap(), before);
    }

    #[test]
    fn test_real_run_removes_exactly_merged() {
        let (_temp, store, index) = setup();
        for i in 1..=3 {
            add(&store, &index, MemoryType::Gotcha, &format!("React useEffect infinite loop variant {}", i));
        }
        add(&store, &index, MemoryType::Decision, "React useEffect infinite loop variant 9");
        add(&store, &index, MemoryType::Gotcha, "Docker volumes on macOS are slow");

        let before = store_count(&store);
        let report = defrag(&store, &index, &DecayConfig::default(), DefragOptions::default()).unwrap();

        assert_eq!(report.merged, 2);
        assert_eq!(report.merged_paths.len(), 2);
        assert_eq!(store_count(&store), before - report.merged);
        assert_eq!(index.count().unwrap(), before - report.merged);
        assert_eq!(report.total_memories, before - report.merged);
        for path in &report.merged_paths {
            assert!(store.read(path).unwrap().is_none());
        }
    }

    #[test]
    fn test_low_relevance_listed() {
        let (_temp, store, index) = setup();
        add(&store, &index, MemoryType::Gotcha, "Low relevance item");
        let note = index.get_by_path("gotchas/low-relevance-item.md").unwrap().unwrap();
        index.update_relevance(&note.id, 0.05).unwrap();

        let report = defrag(&store, &index, &DecayConfig::default(), DefragOptions { dry_run: true }).unwrap();
        assert_eq!(report.archived, vec![note.file_path]);
        assert_eq!(report.merged, 0);
    }

    #[test]
    fn test_query_errors_skip_survivor() {
        let (_temp, store, index) = setup();
        add(&store, &index, MemoryType::Gotcha, "NOT this one either");
        add(&store, &index, MemoryType::Gotcha, "NOT this one either again");

        let report = defrag(&store, &index, &DecayConfig::default(), DefragOptions { dry_run: true }).unwrap();
        assert_eq!(report.merged, 0);
        assert_eq!(report.total_memories, 2);
    }

    #[test]
    fn test_more_relevant_note_survives() {
        let (_temp, store, index) = setup();
        let long = add_ranked(&store, &index, "alpha beta gamma delta epsilon zeta eta theta", 1.0);
        let short = add_ranked(&store, &index, "zeta eta theta", 0.5);

        let report = defrag(&store, &index, &DecayConfig::default(), DefragOptions::default()).unwrap();

        assert_eq!(report.merged_paths, vec![short.clone()]);
        assert!(store.read(&long).unwrap().is_some());
        assert!(store.read(&short).unwrap().is_none());
        assert!(index.get_by_path(&long).unwrap().is_some());
        assert_eq!(index.count().unwrap(), 1);
    }

    #[test]
    fn test_lower_relevance_duplicate_is_merged_into_survivor() {
        let (_temp, store, index) = setup();
        let high = add_ranked(&store, &index, "Redis cache keys expire early", 0.9);
        let low = add_ranked(&store, &index, "Redis cache keys expire early on restart", 0.3);

        let report = defrag(&store, &index, &DecayConfig::default(), DefragOptions { dry_run: true }).unwrap();
        assert_eq!(report.merged_paths, vec![low]);
        assert!(store.read(&high).unwrap().is_some());
    }
}
