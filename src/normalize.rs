//! Candidate normalization and title deduplication.
//!
//! Turns the raw [`Candidate`]s of one run into [`ArticleRecord`]s: missing
//! labels and timestamps get their defaults, every record shares the run's
//! `crawled_at`, and titles that match case-insensitively collapse to the
//! first occurrence.

use crate::models::{ArticleRecord, Candidate, UNKNOWN_PUBLISHED_AT};
use itertools::Itertools;
use tracing::{debug, instrument};

/// Normalize one run's candidates.
///
/// Relative order of the survivors is preserved. No fuzzy matching is done:
/// only exact titles after trimming and lowercasing count as duplicates.
#[instrument(level = "debug", skip(candidates))]
pub fn normalize(
    candidates: Vec<Candidate>,
    fallback_source: &str,
    crawled_at: &str,
) -> Vec<ArticleRecord> {
    let before = candidates.len();
    let records: Vec<ArticleRecord> = candidates
        .into_iter()
        .filter(|c| !c.title.trim().is_empty())
        .map(|c| ArticleRecord {
            title: c.title.trim().to_string(),
            url: c.url,
            source: c
                .source
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| fallback_source.to_string()),
            published_at: c
                .published_at
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_PUBLISHED_AT.to_string()),
            crawled_at: crawled_at.to_string(),
        })
        .unique_by(ArticleRecord::title_key)
        .collect();

    debug!(before, after = records.len(), "Normalized candidates");
    records
}
