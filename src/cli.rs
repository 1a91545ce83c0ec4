//! Command-line interface for the semiconductor news crawler.
//!
//! Global options may come from flags or environment variables; the
//! subcommand defaults to `run` when none is given.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Crawl every source and rebuild the combined feed
/// semiconductor_news
///
/// # Crawl only CNBC into a custom directory
/// semiconductor_news --data-dir /srv/news crawl cnbc
///
/// # Email the CNBC digest
/// GMAIL_SENDER=bot@gmail.com GMAIL_APP_PASSWORD=... semiconductor_news notify --to me@example.com
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for the JSON documents (overrides the config file)
    #[arg(short, long, global = true, env = "NEWS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Gmail address the digest is sent from
    #[arg(long, global = true, env = "GMAIL_SENDER", hide_env_values = true)]
    pub gmail_sender: Option<String>,

    /// Gmail app password for the sender
    #[arg(long, global = true, env = "GMAIL_APP_PASSWORD", hide_env_values = true)]
    pub gmail_app_password: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Crawl every source, then rebuild the combined feed
    Run,
    /// Crawl one source by id (e.g. `cnbc`, `google_news`), no aggregation
    Crawl { source: String },
    /// Rebuild the combined feed from existing source documents
    Aggregate,
    /// Email the HTML digest of a source document
    Notify {
        /// Recipient address
        #[arg(long)]
        to: String,
        /// Document to send; defaults to the first configured source's file
        #[arg(long)]
        document: Option<PathBuf>,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::parse_from(["semiconductor_news"]);
        assert_eq!(cli.command(), Command::Run);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_crawl_with_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "semiconductor_news",
            "crawl",
            "google_news",
            "--data-dir",
            "/tmp/news",
            "-c",
            "news.yaml",
        ]);
        assert_eq!(
            cli.command(),
            Command::Crawl {
                source: "google_news".to_string()
            }
        );
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/news")));
        assert_eq!(cli.config, Some(PathBuf::from("news.yaml")));
    }

    #[test]
    fn test_notify_arguments() {
        let cli = Cli::parse_from([
            "semiconductor_news",
            "notify",
            "--to",
            "reader@example.com",
            "--document",
            "data/google_news_semiconductor.json",
            "--gmail-sender",
            "bot@gmail.com",
        ]);
        assert_eq!(
            cli.command(),
            Command::Notify {
                to: "reader@example.com".to_string(),
                document: Some(PathBuf::from("data/google_news_semiconductor.json")),
            }
        );
        assert_eq!(cli.gmail_sender.as_deref(), Some("bot@gmail.com"));
    }

    #[test]
    fn test_notify_requires_recipient() {
        assert!(Cli::try_parse_from(["semiconductor_news", "notify"]).is_err());
    }
}
