//! Runtime configuration.
//!
//! [`AppConfig`] describes where documents live, how pages are fetched, and
//! every source's extraction parameters. It is either built from defaults
//! (the CNBC and Google News sources) or loaded from a YAML file; every
//! field has a default so a file only needs to state what it overrides.
//!
//! [`MailConfig`] carries the SMTP credentials. It is resolved once in
//! `main` from the CLI/environment and handed to the notifier.

use crate::error::{NewsError, Result};
use crate::models::IdentityKey;
use crate::scrapers::{cnbc, google_news};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Top-level configuration for a crawl run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding every JSON document.
    pub data_dir: PathBuf,
    /// File name of the combined feed inside `data_dir`.
    pub combined_file: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Sources in crawl and aggregation order.
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            combined_file: "combined_semiconductor_news.json".to_string(),
            request_timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sources: vec![cnbc::source_config(), google_news::source_config()],
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, or fall back to defaults when `None`.
    #[instrument(level = "info", skip_all)]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|e| {
                    NewsError::Configuration(format!("cannot read {}: {}", p.display(), e))
                })?;
                let parsed: AppConfig = serde_yaml::from_str(&raw).map_err(|e| {
                    NewsError::Configuration(format!("invalid YAML in {}: {}", p.display(), e))
                })?;
                info!(path = %p.display(), sources = parsed.sources.len(), "Loaded configuration file");
                parsed
            }
            None => AppConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the extractor could not run with.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for source in &self.sources {
            if !ids.insert(source.id.as_str()) {
                return Err(NewsError::Configuration(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }
            source.validate()?;
        }
        if self.request_timeout_secs == 0 {
            return Err(NewsError::Configuration(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn source(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn source_path(&self, source: &SourceConfig) -> PathBuf {
        self.data_dir.join(&source.output_file)
    }

    pub fn combined_path(&self) -> PathBuf {
        self.data_dir.join(&self.combined_file)
    }

    /// Per-source document paths in aggregation order.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.sources.iter().map(|s| self.source_path(s)).collect()
    }
}

/// How card containers are located on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardStrategy {
    /// Semantic container elements; the link is the first `a[href]` inside.
    Semantic { container: String },
    /// A known structural class for the container plus a link selector inside it.
    Structural { container: String, link: String },
    /// Every anchor whose href contains one of `patterns`; the container is its parent.
    LinkScan { patterns: Vec<String> },
}

/// A listing page and whether its hits need the topical keyword filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Listing {
    pub url: String,
    #[serde(default)]
    pub filter: bool,
}

/// Persistence mode for a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StoreMode {
    /// The document holds exactly the latest run.
    #[default]
    Replace,
    /// New records are merged ahead of prior ones by identity key, then trimmed.
    Merge {
        #[serde(default = "default_max_articles")]
        max_articles: usize,
        /// Age limit in days by `crawled_at`. Defaults to 30 when the key is
        /// absent; write `max_age_days: null` to turn age eviction off.
        #[serde(default = "default_max_age_days")]
        max_age_days: Option<i64>,
    },
}

fn default_max_articles() -> usize {
    500
}

fn default_max_age_days() -> Option<i64> {
    Some(30)
}

/// Extraction and persistence parameters for one source.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub id: String,
    /// Label written to the document's `source` field and used as the stats key.
    pub label: String,
    /// Article `source` used when no publication name is found near a card.
    pub fallback_source: String,
    pub output_file: String,
    #[serde(default)]
    pub identity: IdentityKey,
    #[serde(default = "default_min_title_len")]
    pub min_title_len: usize,
    /// Reject resolved URLs whose host does not contain this domain.
    #[serde(default)]
    pub domain_pin: Option<String>,
    #[serde(default = "default_time_selector")]
    pub time_selector: String,
    #[serde(default = "default_time_search_depth")]
    pub time_search_depth: usize,
    /// Element whose text is the publication name, when the page marks it.
    #[serde(default)]
    pub publisher_selector: Option<String>,
    /// Words that identify a short text node as a publication name.
    #[serde(default)]
    pub publisher_keywords: Vec<String>,
    pub strategies: Vec<CardStrategy>,
    pub listings: Vec<Listing>,
    /// Topical keywords for listings with `filter: true`.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub store: StoreMode,
}

fn default_min_title_len() -> usize {
    10
}

fn default_time_selector() -> String {
    "time".to_string()
}

fn default_time_search_depth() -> usize {
    5
}

impl SourceConfig {
    fn validate(&self) -> Result<()> {
        let bad = |what: String| {
            Err(NewsError::Configuration(format!("source '{}': {}", self.id, what)))
        };
        if self.listings.is_empty() {
            return bad("no listing URLs".to_string());
        }
        if self.strategies.is_empty() {
            return bad("no card strategies".to_string());
        }
        for listing in &self.listings {
            if let Err(e) = Url::parse(&listing.url) {
                return bad(format!("invalid listing URL {}: {}", listing.url, e));
            }
        }
        let mut selectors = vec![self.time_selector.as_str()];
        if let Some(sel) = &self.publisher_selector {
            selectors.push(sel);
        }
        for strategy in &self.strategies {
            match strategy {
                CardStrategy::Semantic { container } => selectors.push(container),
                CardStrategy::Structural { container, link } => {
                    selectors.push(container);
                    selectors.push(link);
                }
                CardStrategy::LinkScan { patterns } if patterns.is_empty() => {
                    return bad("link_scan needs at least one pattern".to_string());
                }
                CardStrategy::LinkScan { .. } => {}
            }
        }
        for sel in selectors {
            if Selector::parse(sel).is_err() {
                return bad(format!("invalid CSS selector '{}'", sel));
            }
        }
        if self.listings.iter().any(|l| l.filter) && self.keywords.is_empty() {
            return bad("filtered listings need keywords".to_string());
        }
        if let StoreMode::Merge {
            max_age_days: Some(days),
            ..
        } = self.store
        {
            if days < 0 || chrono::Duration::try_days(days).is_none() {
                return bad(format!("max_age_days out of range: {}", days));
            }
        }
        Ok(())
    }
}

/// SMTP settings for the digest mailer.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub sender: Option<String>,
    pub app_password: Option<String>,
    pub smtp_host: String,
}

impl MailConfig {
    pub fn new(sender: Option<String>, app_password: Option<String>) -> Self {
        Self {
            sender,
            app_password,
            smtp_host: "smtp.gmail.com".to_string(),
        }
    }

    /// Sender address and password, or a configuration error naming what is missing.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let sender = self.sender.as_deref().filter(|s| !s.trim().is_empty());
        let password = self.app_password.as_deref().filter(|s| !s.is_empty());
        match (sender, password) {
            (Some(s), Some(p)) => Ok((s, p)),
            _ => Err(NewsError::Configuration(
                "GMAIL_SENDER and GMAIL_APP_PASSWORD must both be set".to_string(),
            )),
        }
    }
}
