//! Data models for scraped articles and the JSON documents they live in.
//!
//! - [`Candidate`]: an unvalidated hit pulled from one card container
//! - [`ArticleRecord`]: a normalized, timestamped article
//! - [`SourceDocument`]: one source's persisted collection
//! - [`CombinedDocument`]: the cross-source feed written by the aggregator
//!
//! Field names are snake_case on the wire. Older documents used
//! `published_time` and `articles_today`; both are still accepted on read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel used when no timestamp could be found near a card.
pub const UNKNOWN_PUBLISHED_AT: &str = "Recently";

/// An article hit as extracted from a listing page, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Visible headline text.
    pub title: String,
    /// Absolute URL of the article.
    pub url: String,
    /// Publication label, when one was found near the card.
    pub source: Option<String>,
    /// Machine-readable datetime or human-readable relative time.
    pub published_at: Option<String>,
}

/// A normalized article as persisted in every JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRecord {
    pub title: String,
    pub url: String,
    pub source: String,
    #[serde(alias = "published_time", default = "default_published_at")]
    pub published_at: String,
    #[serde(default)]
    pub crawled_at: String,
}

fn default_published_at() -> String {
    UNKNOWN_PUBLISHED_AT.to_string()
}

impl ArticleRecord {
    /// Case-insensitive title key used for title-based deduplication.
    pub fn title_key(&self) -> String {
        self.title.trim().to_lowercase()
    }
}

/// Which field decides whether two records are the same article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKey {
    /// Resolved URL; used where URLs are stable (CNBC).
    Url,
    /// Case-insensitive title; used where URLs are redirect tokens (Google News).
    #[default]
    Title,
}

impl IdentityKey {
    pub fn of_record(self, record: &ArticleRecord) -> String {
        match self {
            IdentityKey::Url => record.url.clone(),
            IdentityKey::Title => record.title_key(),
        }
    }

    pub fn of_candidate(self, candidate: &Candidate) -> String {
        match self {
            IdentityKey::Url => candidate.url.clone(),
            IdentityKey::Title => candidate.title.trim().to_lowercase(),
        }
    }
}

/// One source's persisted collection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SourceDocument {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub total_articles: usize,
    #[serde(alias = "articles_today", default)]
    pub new_articles_today: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub articles: Vec<ArticleRecord>,
}

/// Per-source counts reported in the combined feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceStats {
    pub total: usize,
    pub new_today: usize,
}

/// The cross-source feed written by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CombinedDocument {
    pub last_updated: String,
    pub total_articles: usize,
    /// Keyed by source label; serialized in label order.
    pub sources: BTreeMap<String, SourceStats>,
    pub duplicates_removed: usize,
    pub articles: Vec<ArticleRecord>,
}
