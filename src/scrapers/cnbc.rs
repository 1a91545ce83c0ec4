//! CNBC section-page source.
//!
//! CNBC lists stories in `.Card-titleContainer` blocks whose headline is an
//! `a.Card-title` and whose relative time ("2 Hours Ago") sits in a nearby
//! `.Card-time`. The semiconductors section is dedicated and kept whole; the
//! technology section is shared with unrelated stories, so its hits go
//! through the keyword filter.
//!
//! CNBC URLs are stable, so the identity key is the URL, and links are
//! pinned to `cnbc.com` to drop partner and ad placements.

use crate::config::{CardStrategy, Listing, SourceConfig, StoreMode};
use crate::models::IdentityKey;

pub const SEMICONDUCTORS_URL: &str = "https://www.cnbc.com/semiconductors/";
pub const TECHNOLOGY_URL: &str = "https://www.cnbc.com/technology/";

/// Topical keywords applied to the technology section.
pub const KEYWORDS: &[&str] = &[
    "semiconductor",
    "chip",
    "technology",
    "tech",
    "nvidia",
    "amd",
    "intel",
    "tsmc",
];

pub fn source_config() -> SourceConfig {
    SourceConfig {
        id: "cnbc".to_string(),
        label: "CNBC".to_string(),
        fallback_source: "CNBC".to_string(),
        output_file: "semiconductor_news.json".to_string(),
        identity: IdentityKey::Url,
        min_title_len: 5,
        domain_pin: Some("cnbc.com".to_string()),
        time_selector: ".Card-time".to_string(),
        time_search_depth: 3,
        publisher_selector: None,
        publisher_keywords: Vec::new(),
        strategies: vec![CardStrategy::Structural {
            container: ".Card-titleContainer".to_string(),
            link: "a.Card-title".to_string(),
        }],
        listings: vec![
            Listing {
                url: SEMICONDUCTORS_URL.to_string(),
                filter: false,
            },
            Listing {
                url: TECHNOLOGY_URL.to_string(),
                filter: true,
            },
        ],
        keywords: KEYWORDS.iter().map(|k| k.to_string()).collect(),
        store: StoreMode::Replace,
    }
}
