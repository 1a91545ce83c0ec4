//! Listing-page scrapers for the semiconductor news sources.
//!
//! Every source follows the same two-phase pattern:
//!
//! 1. **Fetching**: download each configured listing page with browser-like
//!    headers and a bounded timeout
//! 2. **Extracting**: hand the HTML to an [`ExtractionStrategy`] that
//!    returns article [`Candidate`]s
//!
//! # Supported Sources
//!
//! | Source | Module | Cards | Identity |
//! |--------|--------|-------|----------|
//! | CNBC | [`cnbc`] | `.Card-titleContainer` | URL |
//! | Google News | [`google_news`] | `<article>`, then `/read/` link scan | title |
//!
//! Source differences are data ([`SourceConfig`]), not code: both run
//! through [`HeuristicExtractor`].
//!
//! # Failure Handling
//!
//! A listing URL that fails to fetch is logged and contributes nothing;
//! the remaining URLs are still crawled. A source whose every URL fails
//! yields an empty list.

pub mod cnbc;
pub mod extract;
pub mod google_news;

pub use extract::{ExtractionStrategy, HeuristicExtractor};

use crate::config::{AppConfig, SourceConfig};
use crate::error::{NewsError, Result};
use crate::models::Candidate;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use url::Url;

/// HTTP client for listing pages.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Self::with_timeout(&config.user_agent, Duration::from_secs(config.request_timeout_secs))
    }

    pub fn with_timeout(user_agent: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| NewsError::Configuration(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// GET a page and return its body; non-2xx statuses are errors.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NewsError::fetch(url, e))?;
        let response = response
            .error_for_status()
            .map_err(|e| NewsError::fetch(url, e))?;
        let body = response.text().await.map_err(|e| NewsError::fetch(url, e))?;
        debug!(bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

/// Crawl every listing URL of `source` in order and return its candidates.
///
/// Failed URLs are logged and skipped. Duplicates across listing pages are
/// dropped by the source's identity key, first occurrence wins.
#[instrument(level = "info", skip_all, fields(source = %source.id))]
pub async fn crawl_source<E>(fetcher: &PageFetcher, extractor: &E, source: &SourceConfig) -> Vec<Candidate>
where
    E: ExtractionStrategy + ?Sized,
{
    let per_page: Vec<Vec<Candidate>> = stream::iter(source.listings.iter())
        .then(|listing| async move {
            info!(url = %listing.url, filter = listing.filter, "Fetching listing page");
            let page_url = match Url::parse(&listing.url) {
                Ok(u) => u,
                Err(e) => {
                    error!(url = %listing.url, error = %e, "Invalid listing URL; skipping");
                    return Vec::new();
                }
            };
            match fetcher.fetch(&listing.url).await {
                Ok(html) => extractor.extract(&html, &page_url, listing.filter),
                Err(e) => {
                    error!(url = %listing.url, error = %e, "Listing fetch failed; skipping");
                    Vec::new()
                }
            }
        })
        .collect()
        .await;

    let identity = source.identity;
    let candidates: Vec<Candidate> = per_page
        .into_iter()
        .flatten()
        .unique_by(|c| identity.of_candidate(c))
        .collect();

    info!(count = candidates.len(), "Crawled source");
    candidates
}
