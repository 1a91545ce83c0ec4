//! Google News "Semiconductors" topic source.
//!
//! The topic page is mostly script-rendered, so extraction tries the
//! `<article>` containers first and falls back to scanning every link whose
//! href points at a `./read/...` redirect. Timestamps look like
//!
//! ```text
//! <time class="hvbAAd" datetime="2026-02-17T05:34:00Z">2 days ago</time>
//! ```
//!
//! and the `datetime` attribute is preferred. The publication is marked by
//! an `a[data-n-tid]`; failing that, a short nearby text containing a
//! masthead word is used.
//!
//! Redirect tokens are not stable between fetches, so the identity key is
//! the title.

use crate::config::{CardStrategy, Listing, SourceConfig, StoreMode};
use crate::models::IdentityKey;

pub const TOPIC_URL: &str = "https://news.google.com/topics/CAAqKAgKIiJDQkFTRXdvS0wyMHZNRGh0YUROclpCSUZaVzR0UjBJb0FBUAE?hl=en-US&gl=US&ceid=US%3Aen";

/// Words that mark a short text node as a publication name.
pub const PUBLISHER_KEYWORDS: &[&str] = &[
    "Times", "Post", "News", "Journal", "Daily", "Business", "Financial", "Economic", "Wire",
    "Reuters", "Bloomberg", "CNN", "BBC", "CNBC", "Forbes", "WSJ", "Guardian", "Today", "Herald",
    "Tribune", "Gazette",
];

pub fn source_config() -> SourceConfig {
    SourceConfig {
        id: "google_news".to_string(),
        label: "Google News - Semiconductor Topic".to_string(),
        fallback_source: "Google News".to_string(),
        output_file: "google_news_semiconductor.json".to_string(),
        identity: IdentityKey::Title,
        min_title_len: 10,
        domain_pin: None,
        time_selector: "time".to_string(),
        time_search_depth: 5,
        publisher_selector: Some("a[data-n-tid]".to_string()),
        publisher_keywords: PUBLISHER_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        strategies: vec![
            CardStrategy::Semantic {
                container: "article".to_string(),
            },
            CardStrategy::LinkScan {
                patterns: vec!["./read/".to_string(), "/read/".to_string()],
            },
        ],
        listings: vec![Listing {
            url: TOPIC_URL.to_string(),
            filter: false,
        }],
        keywords: Vec::new(),
        store: StoreMode::Replace,
    }
}
