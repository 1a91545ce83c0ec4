//! Cross-source aggregation into the combined feed.
//!
//! Source documents are read in configured order, their article lists are
//! concatenated, and titles that match case-insensitively collapse to the
//! first occurrence. The combined document records per-source counts and
//! how many duplicates were dropped, so that
//! `duplicates_removed == sum(source lengths) - total_articles` always holds.

use crate::error::Result;
use crate::models::{ArticleRecord, CombinedDocument, SourceDocument, SourceStats};
use crate::outputs::store::{read_document, write_json};
use crate::utils::to_iso8601;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

/// Read every available source document, combine, and write the result.
///
/// Missing or unreadable source files are skipped with a log line; only a
/// failure to write the combined document is an error.
#[instrument(level = "info", skip_all, fields(output = %output.display(), sources = source_paths.len()))]
pub async fn aggregate(source_paths: &[PathBuf], output: &Path) -> Result<CombinedDocument> {
    let mut documents = Vec::with_capacity(source_paths.len());
    for path in source_paths {
        match read_document(path).await {
            Ok(Some(doc)) => {
                let name = doc
                    .source
                    .clone()
                    .unwrap_or_else(|| path.display().to_string());
                info!(source = %name, articles = doc.articles.len(), new = doc.new_articles_today, "Loaded source document");
                documents.push((name, doc));
            }
            Ok(None) => warn!(path = %path.display(), "Source document not found; skipping"),
            Err(e) => error!(path = %path.display(), error = %e, "Source document unreadable; skipping"),
        }
    }

    let combined = combine(documents, Utc::now());
    write_json(&combined, output).await?;
    info!(
        total = combined.total_articles,
        duplicates_removed = combined.duplicates_removed,
        "Wrote combined feed"
    );
    Ok(combined)
}

/// Pure combination step: concatenate in order and deduplicate by title.
///
/// Articles with an empty title are dropped and counted as removed.
pub fn combine(documents: Vec<(String, SourceDocument)>, now: DateTime<Utc>) -> CombinedDocument {
    let mut sources = BTreeMap::new();
    let mut all: Vec<ArticleRecord> = Vec::new();
    for (name, doc) in documents {
        let stats = SourceStats {
            total: doc.articles.len(),
            new_today: doc.new_articles_today,
        };
        // Two documents with the same label: counts add up.
        sources
            .entry(name)
            .and_modify(|s: &mut SourceStats| {
                s.total += stats.total;
                s.new_today += stats.new_today;
            })
            .or_insert(stats);
        all.extend(doc.articles);
    }

    let before = all.len();
    let mut seen = HashSet::new();
    let articles: Vec<ArticleRecord> = all
        .into_iter()
        .filter(|a| {
            let key = a.title_key();
            !key.is_empty() && seen.insert(key)
        })
        .collect();

    CombinedDocument {
        last_updated: to_iso8601(now),
        total_articles: articles.len(),
        sources,
        duplicates_removed: before - articles.len(),
        articles,
    }
}
