//! Exponential relevance decay and access boosts.
//!
//! `relevance(t) = relevance × e^(−λ × days since last access)`

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DecayConfig;
use crate::error::Result;
use crate::index::SearchIndex;
use crate::memory::NoteStore;
use crate::time::{days_between, now_utc};
use crate::types::clamp_relevance;

/// Changes smaller than this are not written back.
pub const DECAY_EPSILON: f64 = 0.001;

/// Amount `deprecate` lowers a note's relevance by.
pub const DEPRECATE_AMOUNT: f64 = -0.3;

/// Outcome of a decay pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecayReport {
    /// Notes whose relevance changed
    pub updated: usize,
    /// Updated notes that fell below the archive threshold
    pub archived: Vec<String>,
    /// Updated notes below the delete threshold and older than the minimum age
    pub suggest_delete: Vec<String>,
}

/// Decay every non-pinned note as of now.
pub fn apply_decay(
    index: &SearchIndex,
    store: &NoteStore,
    config: &DecayConfig,
    dry_run: bool,
) -> Result<DecayReport> {
    apply_decay_at(index, store, config, now_utc(), dry_run)
}

/// Decay every non-pinned note as of `now`.
///
/// Notes are never deleted; candidates are only reported. With `dry_run`
/// the report is computed but nothing is written.
///
/// Note files are rewritten one at a time before the index is updated in a
/// single transaction. If a file write fails partway, the files already
/// written hold the decayed scores while the index still has the old ones;
/// [`SearchIndex::rebuild`] brings the index back in line with the files.
pub fn apply_decay_at(
    index: &SearchIndex,
    store: &NoteStore,
    config: &DecayConfig,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<DecayReport> {
    let mut report = DecayReport::default();
    if !config.enabled {
        return Ok(report);
    }

    let mut updates: Vec<(String, f64)> = Vec::new();
    for note in index.all()? {
        if config.pinned_types.contains(&note.memory_type) {
            continue;
        }

        let days = days_between(note.last_touched(), now).max(0.0);
        let decayed = (note.relevance * (-config.lambda * days).exp()).max(0.0);
        if (decayed - note.relevance).abs() < DECAY_EPSILON {
            continue;
        }

        debug!(
            "Decaying {} from {:.3} to {:.3} ({:.1} days idle)",
            note.file_path, note.relevance, decayed, days
        );
        if !dry_run && store.set_relevance(&note.file_path, decayed)?.is_none() {
            warn!("Note file {} is missing; index row updated only", note.file_path);
        }
        updates.push((note.id.clone(), decayed));
        report.updated += 1;

        if decayed < config.archive_threshold {
            report.archived.push(note.file_path.clone());
            let age_days = days_between(note.created_at, now);
            if decayed < config.delete_threshold && age_days > config.delete_min_age_days {
                report.suggest_delete.push(note.file_path);
            }
        }
    }

    if !dry_run {
        index.update_relevances(&updates)?;
    }

    info!(
        "Decay updated {} notes ({} archived, {} suggested for deletion)",
        report.updated,
        report.archived.len(),
        report.suggest_delete.len()
    );
    Ok(report)
}

/// Adjust a note's relevance by `amount` and count it as an access.
///
/// Both the index row and the note file are updated. Returns the new
/// relevance, or `None` if no note is indexed at `file_path`.
pub fn boost_relevance(
    index: &SearchIndex,
    store: &NoteStore,
    file_path: &str,
    amount: f64,
) -> Result<Option<f64>> {
    let Some(note) = index.get_by_path(file_path)? else {
        return Ok(None);
    };

    let relevance = clamp_relevance(note.relevance + amount);
    let now = now_utc();

    index.record_access(&note.id, relevance, now)?;
    if store.record_access(file_path, relevance, now)?.is_none() {
        warn!("Note file {} is missing; index row updated only", file_path);
    }

    debug!("Relevance of {} is now {:.3}", file_path, relevance);
    Ok(Some(relevance))
}

/// Mark a note as less useful.
pub fn deprecate(index: &SearchIndex, store: &NoteStore, file_path: &str) -> Result<Option<f64>> {
    boost_relevance(index, store, file_path, DEPRECATE_AMOUNT)
}
