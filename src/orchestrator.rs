//! Pipeline orchestration.
//!
//! A run crawls every configured source in order (fetch, extract,
//! normalize, save) and then always aggregates whatever documents exist.
//! Each source step runs in its own spawned task, so an error or a panic in
//! one source is recorded as that source's failure and the run carries on.

use crate::config::{AppConfig, SourceConfig};
use crate::error::{NewsError, Result};
use crate::models::{CombinedDocument, SourceDocument};
use crate::normalize::normalize;
use crate::outputs::combined::aggregate;
use crate::outputs::store::Store;
use crate::scrapers::{HeuristicExtractor, PageFetcher, crawl_source};
use crate::utils::{ensure_writable_dir, now_iso8601};
use std::future::Future;
use tracing::{error, info, instrument, warn};

/// Result of one source step.
#[derive(Debug)]
pub struct SourceOutcome {
    pub id: String,
    pub label: String,
    /// `(total, new_today)` on success, the failure message otherwise.
    pub result: std::result::Result<(usize, usize), String>,
}

impl SourceOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub sources: Vec<SourceOutcome>,
    /// `None` when writing the combined document failed.
    pub combined: Option<CombinedDocument>,
}

impl RunReport {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| !s.succeeded()).count()
    }

    /// Log the per-source ✓/✗ lines and the combined totals.
    pub fn log_summary(&self) {
        for s in &self.sources {
            match &s.result {
                Ok((total, new)) => info!("✓ {}: {} articles ({} new)", s.label, total, new),
                Err(reason) => warn!("✗ {}: {}", s.label, reason),
            }
        }
        match &self.combined {
            Some(c) => info!(
                total = c.total_articles,
                duplicates_removed = c.duplicates_removed,
                "✓ Combined feed"
            ),
            None => warn!("✗ Combined feed was not written"),
        }
        info!(
            succeeded = self.sources.len() - self.failed_sources(),
            failed = self.failed_sources(),
            "Run complete"
        );
    }
}

/// Crawl one source end to end and persist its document.
#[instrument(level = "info", skip_all, fields(source = %source.id))]
pub async fn run_source(config: &AppConfig, source: &SourceConfig) -> Result<SourceDocument> {
    ensure_writable_dir(&config.data_dir).await?;
    let fetcher = PageFetcher::new(config)?;
    let extractor = HeuristicExtractor::new(source)?;

    let candidates = crawl_source(&fetcher, &extractor, source).await;
    let crawled_at = now_iso8601();
    let records = normalize(candidates, &source.fallback_source, &crawled_at);
    info!(articles = records.len(), "Normalized source articles");

    Store::for_source(config, source).save(records).await
}

/// Run `step` on its own task and turn its result, error, or panic into an
/// outcome.
async fn isolated<F>(source: &SourceConfig, step: F) -> SourceOutcome
where
    F: Future<Output = Result<SourceDocument>> + Send + 'static,
{
    let result = match tokio::spawn(step).await {
        Ok(Ok(doc)) => Ok((doc.total_articles, doc.new_articles_today)),
        Ok(Err(e)) => {
            error!(source = %source.id, error = %e, "Source step failed");
            Err(e.to_string())
        }
        Err(join) => {
            let reason = if join.is_panic() {
                "source step panicked".to_string()
            } else {
                format!("source step aborted: {join}")
            };
            error!(source = %source.id, %reason, "Source step did not complete");
            Err(reason)
        }
    };
    SourceOutcome {
        id: source.id.clone(),
        label: source.label.clone(),
        result,
    }
}

/// Crawl a single configured source by id; no aggregation.
pub async fn run_one(config: &AppConfig, id: &str) -> Result<SourceOutcome> {
    let source = config
        .source(id)
        .ok_or_else(|| NewsError::Configuration(format!("unknown source {id:?}")))?
        .clone();
    let (cfg, src) = (config.clone(), source.clone());
    Ok(isolated(&source, async move { run_source(&cfg, &src).await }).await)
}

/// Crawl every source in order, then aggregate.
#[instrument(level = "info", skip_all, fields(sources = config.sources.len()))]
pub async fn run_all(config: &AppConfig) -> RunReport {
    run_with(config, |cfg, src| async move { run_source(&cfg, &src).await }).await
}

async fn run_with<S, F>(config: &AppConfig, step: S) -> RunReport
where
    S: Fn(AppConfig, SourceConfig) -> F,
    F: Future<Output = Result<SourceDocument>> + Send + 'static,
{
    let mut report = RunReport::default();
    for source in &config.sources {
        info!(source = %source.id, "Starting source");
        let outcome = isolated(source, step(config.clone(), source.clone())).await;
        report.sources.push(outcome);
    }

    report.combined = match aggregate(&config.source_paths(), &config.combined_path()).await {
        Ok(combined) => Some(combined),
        Err(e) => {
            error!(error = %e, "Aggregation failed");
            None
        }
    };
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CardStrategy, Listing};
    use crate::outputs::store::read_document;
    use crate::scrapers::{cnbc, google_news};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CNBC_PAGE: &str = r#"
<html><body>
  <div class="Card-textContent">
    <div class="Card-titleContainer">
      <a class="Card-title" href="https://www.cnbc.com/2026/02/17/chip-co.html">Chip Co beats earnings</a>
    </div>
    <span class="Card-time">2 Hours Ago</span>
  </div>
</body></html>
"#;

    const GOOGLE_PAGE: &str = r#"
<html><body>
  <article>
    <a href="./read/CBMiAAA">chip co BEATS earnings</a>
    <div><a data-n-tid="9" href="./publications/1">Reuters</a></div>
    <time datetime="2026-02-17T05:34:00Z">2 days ago</time>
  </article>
  <article>
    <a href="./read/CBMiBBB">Micron sells out HBM for the year</a>
  </article>
</body></html>
"#;

    async fn serve(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    fn config(server: &MockServer, data_dir: &TempDir) -> AppConfig {
        let mut cnbc = cnbc::source_config();
        cnbc.listings = vec![Listing {
            url: format!("{}/semiconductors/", server.uri()),
            filter: false,
        }];
        let mut google = google_news::source_config();
        google.listings = vec![Listing {
            url: format!("{}/topics/semis", server.uri()),
            filter: false,
        }];
        AppConfig {
            data_dir: data_dir.path().to_path_buf(),
            request_timeout_secs: 5,
            sources: vec![cnbc, google],
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_all_writes_sources_and_combined() {
        let server = MockServer::start().await;
        serve(&server, "/semiconductors/", CNBC_PAGE).await;
        serve(&server, "/topics/semis", GOOGLE_PAGE).await;
        let tmp = TempDir::new().unwrap();
        let config = config(&server, &tmp);

        let report = run_all(&config).await;
        assert_eq!(report.failed_sources(), 0);

        let cnbc_doc = read_document(&tmp.path().join("semiconductor_news.json"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cnbc_doc.total_articles, 1);
        assert_eq!(cnbc_doc.articles[0].source, "CNBC");
        assert_eq!(cnbc_doc.articles[0].published_at, "2 Hours Ago");

        let google_doc = read_document(&tmp.path().join("google_news_semiconductor.json"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(google_doc.total_articles, 2);
        assert_eq!(google_doc.articles[0].source, "Reuters");
        assert_eq!(google_doc.articles[1].source, "Google News");
        assert_eq!(google_doc.articles[1].published_at, "Recently");

        let combined = report.combined.unwrap();
        assert_eq!(combined.total_articles, 2);
        assert_eq!(combined.duplicates_removed, 1);
        assert_eq!(combined.articles[0].title, "Chip Co beats earnings");
        assert!(tmp.path().join("combined_semiconductor_news.json").exists());
    }

    #[tokio::test]
    async fn test_failing_source_does_not_stop_run() {
        let server = MockServer::start().await;
        serve(&server, "/topics/semis", GOOGLE_PAGE).await;
        let tmp = TempDir::new().unwrap();
        let mut config = config(&server, &tmp);
        config.sources[0].strategies = vec![CardStrategy::Semantic {
            container: "[[[".to_string(),
        }];

        let report = run_all(&config).await;
        assert_eq!(report.failed_sources(), 1);
        assert!(!report.sources[0].succeeded());
        assert!(report.sources[1].succeeded());
        assert_eq!(report.combined.unwrap().total_articles, 2);
    }

    #[tokio::test]
    async fn test_unreachable_listings_still_write_empty_document() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let config = config(&server, &tmp);

        let report = run_all(&config).await;
        assert_eq!(report.failed_sources(), 0);
        assert!(report.sources.iter().all(|s| s.result == Ok((0, 0))));
        assert_eq!(report.combined.unwrap().total_articles, 0);
    }

    #[tokio::test]
    async fn test_panicking_step_is_captured() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let config = config(&server, &tmp);

        let report = run_with(&config, |_, src| async move {
            if src.id == "cnbc" {
                panic!("selector engine exploded");
            }
            Ok(SourceDocument::default())
        })
        .await;

        assert_eq!(report.sources[0].result, Err("source step panicked".to_string()));
        assert!(report.sources[1].succeeded());
        assert!(report.combined.is_some());
    }

    #[tokio::test]
    async fn test_run_one_unknown_source() {
        let server = MockServer::start().await;
        let tmp = TempDir::new().unwrap();
        let err = run_one(&config(&server, &tmp), "reuters").await.unwrap_err();
        assert!(matches!(err, NewsError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_run_one_skips_aggregation() {
        let server = MockServer::start().await;
        serve(&server, "/semiconductors/", CNBC_PAGE).await;
        let tmp = TempDir::new().unwrap();

        let outcome = run_one(&config(&server, &tmp), "cnbc").await.unwrap();
        assert_eq!(outcome.result, Ok((1, 1)));
        assert!(!tmp.path().join("combined_semiconductor_news.json").exists());
    }
}
