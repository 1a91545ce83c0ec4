//! # Semiconductor News
//!
//! Crawls semiconductor-industry headlines from CNBC's section pages and
//! the Google News "Semiconductors" topic, normalizes and deduplicates them,
//! keeps one JSON document per source plus a combined feed, and can email
//! an HTML digest.
//!
//! ## Usage
//!
//! ```sh
//! semiconductor_news                       # run: crawl all + aggregate
//! semiconductor_news crawl cnbc            # one source only
//! semiconductor_news aggregate             # rebuild the combined feed
//! semiconductor_news notify --to me@x.com  # send the digest
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: listing pages are downloaded one at a time with browser headers
//! 2. **Extracting**: configured card strategies turn HTML into candidates
//! 3. **Normalizing**: defaults applied, duplicate titles collapsed
//! 4. **Storing**: each source's document is replaced (or merged) on disk
//! 5. **Aggregating**: all documents are combined into one deduplicated feed

use clap::Parser;
use std::error::Error;
use tracing::{error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod models;
mod normalize;
mod notify;
mod orchestrator;
mod outputs;
mod scrapers;
mod utils;

use cli::{Cli, Command};
use config::{AppConfig, MailConfig};
use notify::{Notifier, SmtpTransport};
use outputs::combined::aggregate;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("semiconductor_news starting up");

    let args = Cli::parse();
    let mut config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Cannot load configuration");
            return Err(e.into());
        }
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    info!(data_dir = %config.data_dir.display(), sources = config.sources.len(), "Configuration ready");

    match args.command() {
        Command::Run => {
            let report = orchestrator::run_all(&config).await;
            report.log_summary();
        }
        Command::Crawl { source } => match orchestrator::run_one(&config, &source).await {
            Ok(outcome) => match outcome.result {
                Ok((total, new)) => {
                    info!(source = %outcome.id, "✓ {}: {} articles ({} new)", outcome.label, total, new)
                }
                Err(reason) => error!(source = %outcome.id, "✗ {}: {}", outcome.label, reason),
            },
            Err(e) => error!(error = %e, "Crawl not started"),
        },
        Command::Aggregate => {
            if let Err(e) = aggregate(&config.source_paths(), &config.combined_path()).await {
                error!(error = %e, "Aggregation failed");
            }
        }
        Command::Notify { to, document } => {
            let mail = MailConfig::new(args.gmail_sender.clone(), args.gmail_app_password.clone());
            let document = document.or_else(|| {
                config.sources.first().map(|s| config.source_path(s))
            });
            let result = match (SmtpTransport::from_config(&mail), document) {
                (Ok(transport), Some(path)) => Notifier::new(transport, mail)
                    .send_digest(&path, &to)
                    .await
                    .map(|_| ()),
                (Err(e), _) => Err(e),
                (_, None) => Err(error::NewsError::Configuration(
                    "no document given and no sources configured".to_string(),
                )),
            };
            if let Err(e) = result {
                error!(error = %e, "Digest not sent");
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}
