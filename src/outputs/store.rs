//! Per-source JSON document persistence.
//!
//! Each source owns one document (see [`SourceDocument`]). Two save modes
//! exist, chosen per source in the configuration:
//!
//! - [`StoreMode::Replace`] (default): the document is exactly this run's
//!   articles and every one of them counts as new.
//! - [`StoreMode::Merge`]: this run's unseen articles go first, followed by
//!   the prior collection (with re-seen articles refreshed in place), then
//!   the retention policy trims by age and count.
//!
//! Reading never fails the pipeline: a missing or unreadable document is an
//! empty prior collection.

use crate::config::{AppConfig, SourceConfig, StoreMode};
use crate::error::{NewsError, Result};
use crate::models::{ArticleRecord, IdentityKey, SourceDocument};
use crate::utils::{parse_timestamp, to_iso8601};
use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

/// Documents written before the metadata wrapper existed were bare arrays.
#[derive(Deserialize)]
#[serde(untagged)]
enum OnDisk {
    Document(SourceDocument),
    Bare(Vec<ArticleRecord>),
}

/// Read a source document.
///
/// Returns `Ok(None)` when the file does not exist and a persistence error
/// when it exists but cannot be read or parsed.
pub async fn read_document(path: &Path) -> Result<Option<SourceDocument>> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(NewsError::persistence(path.display().to_string(), e)),
    };
    let parsed: OnDisk = serde_json::from_str(&raw)
        .map_err(|e| NewsError::persistence(path.display().to_string(), e))?;
    Ok(Some(match parsed {
        OnDisk::Document(doc) => doc,
        OnDisk::Bare(articles) => SourceDocument {
            total_articles: articles.len(),
            articles,
            ..SourceDocument::default()
        },
    }))
}

/// Serialize `value` as pretty JSON at `path`, creating parent directories.
pub async fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| NewsError::persistence(parent.display().to_string(), e))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)
        .await
        .map_err(|e| NewsError::persistence(path.display().to_string(), e))?;
    Ok(())
}

/// One source's document on disk.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    label: Option<String>,
    identity: IdentityKey,
    mode: StoreMode,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>, identity: IdentityKey, mode: StoreMode) -> Self {
        Self {
            path: path.into(),
            label: None,
            identity,
            mode,
        }
    }

    pub fn for_source(config: &AppConfig, source: &SourceConfig) -> Self {
        Self::new(config.source_path(source), source.identity, source.store)
            .with_label(source.label.clone())
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Load the prior document; missing or corrupt files load as empty.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> SourceDocument {
        match read_document(&self.path).await {
            Ok(Some(doc)) => {
                debug!(articles = doc.articles.len(), "Loaded prior document");
                doc
            }
            Ok(None) => {
                info!("No prior document; starting empty");
                SourceDocument::default()
            }
            Err(e) => {
                error!(error = %e, "Prior document unreadable; starting empty");
                SourceDocument::default()
            }
        }
    }

    /// Persist this run's articles according to the store mode.
    pub async fn save(&self, articles: Vec<ArticleRecord>) -> Result<SourceDocument> {
        self.save_at(articles, Utc::now()).await
    }

    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), incoming = articles.len()))]
    pub async fn save_at(
        &self,
        articles: Vec<ArticleRecord>,
        now: DateTime<Utc>,
    ) -> Result<SourceDocument> {
        let (articles, new_count) = match self.mode {
            StoreMode::Replace => {
                let n = articles.len();
                (articles, n)
            }
            StoreMode::Merge {
                max_articles,
                max_age_days,
            } => {
                let prior = self.load().await.articles;
                let (merged, new_count) = merge(articles, prior, self.identity);
                let retained = retain(merged, max_articles, max_age_days, now);
                let new_count = new_count.min(retained.len());
                (retained, new_count)
            }
        };

        let doc = SourceDocument {
            last_updated: to_iso8601(now),
            total_articles: articles.len(),
            new_articles_today: new_count,
            source: self.label.clone(),
            articles,
        };
        write_json(&doc, &self.path).await?;
        info!(
            total = doc.total_articles,
            new = doc.new_articles_today,
            "Saved source document"
        );
        Ok(doc)
    }
}

/// Unseen fresh records first, then the prior collection with re-seen
/// records swapped for their fresh versions. Returns the merged list and
/// the number of unseen records.
fn merge(
    fresh: Vec<ArticleRecord>,
    prior: Vec<ArticleRecord>,
    identity: IdentityKey,
) -> (Vec<ArticleRecord>, usize) {
    let prior_keys: HashSet<String> = prior.iter().map(|r| identity.of_record(r)).collect();
    let (unseen, reseen): (Vec<_>, Vec<_>) = fresh
        .into_iter()
        .partition(|r| !prior_keys.contains(&identity.of_record(r)));
    let new_count = unseen.len();

    let mut refreshed: HashMap<String, ArticleRecord> = reseen
        .into_iter()
        .map(|r| (identity.of_record(&r), r))
        .collect();

    let merged = unseen
        .into_iter()
        .chain(
            prior
                .into_iter()
                .map(|p| refreshed.remove(&identity.of_record(&p)).unwrap_or(p)),
        )
        .unique_by(|r| identity.of_record(r))
        .collect();
    (merged, new_count)
}

/// Drop records older than `max_age_days` (by `crawled_at`; unparseable
/// timestamps are kept), then keep at most `max_articles`.
fn retain(
    articles: Vec<ArticleRecord>,
    max_articles: usize,
    max_age_days: Option<i64>,
    now: DateTime<Utc>,
) -> Vec<ArticleRecord> {
    let before = articles.len();
    // A window too large to represent evicts nothing.
    let cutoff = max_age_days
        .and_then(Duration::try_days)
        .and_then(|window| now.checked_sub_signed(window));
    let mut kept: Vec<ArticleRecord> = articles
        .into_iter()
        .filter(|r| match (cutoff, parse_timestamp(&r.crawled_at)) {
            (Some(cutoff), Some(at)) => at >= cutoff,
            _ => true,
        })
        .collect();
    kept.truncate(max_articles);
    if kept.len() < before {
        warn!(before, after = kept.len(), "Retention policy evicted articles");
    }
    kept
}
