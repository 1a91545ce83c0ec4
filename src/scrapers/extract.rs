//! Heuristic card extraction shared by every listing source.
//!
//! A listing page is a pile of repeating "cards", each wrapping one
//! article's headline link, a timestamp, and sometimes a publication name.
//! The markup is not ours and changes without notice, so cards are located
//! with an ordered list of [`CardStrategy`]s and the first one that finds
//! anything wins. Each card is then mined for:
//!
//! - a title (anchor text, falling back to the container text)
//! - a URL (resolved against the page, optionally pinned to a domain)
//! - a timestamp (the nearest time element while walking up the tree)
//! - a publication label (a marked element or a keyword-bearing short text)
//!
//! Cards that fail any of these checks are skipped on their own; the rest
//! of the page is still processed.

use crate::config::{CardStrategy, SourceConfig};
use crate::error::{NewsError, Result};
use crate::models::{Candidate, IdentityKey};
use crate::utils::{collapse_whitespace, truncate_for_log};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static NEARBY_TEXT: Lazy<Selector> = Lazy::new(|| Selector::parse("span, div, a").unwrap());

/// Publication labels longer than this are body text, not a masthead.
const MAX_PUBLISHER_LEN: usize = 50;
const MIN_PUBLISHER_LEN: usize = 3;

/// Turns one fetched listing page into article candidates.
///
/// Implementations must be pure over their input so a source can be
/// exercised against stored HTML without touching the network.
pub trait ExtractionStrategy: Send + Sync {
    /// Extract candidates from `html`, fetched from `page_url`.
    ///
    /// When `filter` is set, only candidates matching the source's topical
    /// keywords are returned.
    fn extract(&self, html: &str, page_url: &Url, filter: bool) -> Vec<Candidate>;
}

enum CompiledStrategy {
    Semantic { container: Selector },
    Structural { container: Selector, link: Selector },
    LinkScan { patterns: Vec<String> },
}

/// One card: the element wrapping an article and its headline anchor.
#[derive(Clone, Copy)]
struct Card<'a> {
    container: ElementRef<'a>,
    link: ElementRef<'a>,
    /// Levels searched for a timestamp, counting the container.
    time_depth: usize,
}

/// The configurable extractor used for every built-in source.
pub struct HeuristicExtractor {
    source_id: String,
    strategies: Vec<CompiledStrategy>,
    time: Selector,
    time_search_depth: usize,
    publisher: Option<Selector>,
    publisher_keywords: Vec<String>,
    keywords: Vec<String>,
    min_title_len: usize,
    domain_pin: Option<String>,
    identity: IdentityKey,
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| NewsError::Configuration(format!("invalid selector '{}': {}", selector, e)))
}

impl HeuristicExtractor {
    pub fn new(source: &SourceConfig) -> Result<Self> {
        let strategies = source
            .strategies
            .iter()
            .map(|s| -> Result<CompiledStrategy> {
                Ok(match s {
                    CardStrategy::Semantic { container } => CompiledStrategy::Semantic {
                        container: compile(container)?,
                    },
                    CardStrategy::Structural { container, link } => CompiledStrategy::Structural {
                        container: compile(container)?,
                        link: compile(link)?,
                    },
                    CardStrategy::LinkScan { patterns } => CompiledStrategy::LinkScan {
                        patterns: patterns.clone(),
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source_id: source.id.clone(),
            strategies,
            time: compile(&source.time_selector)?,
            time_search_depth: source.time_search_depth.max(1),
            publisher: source.publisher_selector.as_deref().map(compile).transpose()?,
            publisher_keywords: source.publisher_keywords.clone(),
            keywords: source.keywords.iter().map(|k| k.to_lowercase()).collect(),
            min_title_len: source.min_title_len,
            domain_pin: source.domain_pin.clone(),
            identity: source.identity,
        })
    }

    /// Try each strategy in order; the first one that yields cards wins.
    fn locate_cards<'a>(&self, document: &'a Html) -> Vec<Card<'a>> {
        for (index, strategy) in self.strategies.iter().enumerate() {
            let cards: Vec<Card<'a>> = match strategy {
                CompiledStrategy::Semantic { container } => document
                    .select(container)
                    .filter_map(|c| {
                        c.select(&ANCHOR).next().map(|link| Card {
                            container: c,
                            link,
                            time_depth: 1,
                        })
                    })
                    .collect(),
                CompiledStrategy::Structural { container, link } => document
                    .select(container)
                    .filter_map(|c| {
                        c.select(link).next().map(|l| Card {
                            container: c,
                            link: l,
                            time_depth: self.time_search_depth,
                        })
                    })
                    .collect(),
                CompiledStrategy::LinkScan { patterns } => document
                    .select(&ANCHOR)
                    .filter(|a| {
                        let href = a.value().attr("href").unwrap_or_default();
                        patterns.iter().any(|p| href.contains(p.as_str()))
                    })
                    .map(|a| Card {
                        container: parent_element(a).unwrap_or(a),
                        link: a,
                        time_depth: self.time_search_depth,
                    })
                    .collect(),
            };

            if !cards.is_empty() {
                debug!(source = %self.source_id, strategy = index, count = cards.len(), "Located cards");
                return cards;
            }
            debug!(source = %self.source_id, strategy = index, "Strategy found no cards; trying next");
        }
        Vec::new()
    }

    /// Build a candidate from one card.
    ///
    /// `Ok(None)` means the card was deliberately rejected (short title,
    /// foreign domain, off-topic); `Err` means it was malformed.
    fn candidate_from_card(
        &self,
        card: Card<'_>,
        page_url: &Url,
        filter: bool,
    ) -> Result<Option<Candidate>> {
        let href = card
            .link
            .value()
            .attr("href")
            .ok_or_else(|| NewsError::Parse("card link has no href".to_string()))?;
        let url = resolve_href(page_url, href)
            .ok_or_else(|| NewsError::Parse(format!("unresolvable href '{}'", href)))?;

        if let Some(pin) = &self.domain_pin {
            let host = url.host_str().unwrap_or_default();
            if !host.contains(pin.as_str()) {
                debug!(%url, %pin, "Rejected off-domain link");
                return Ok(None);
            }
        }

        let mut title = element_text(card.link);
        if title.is_empty() {
            title = element_text(card.container);
        }
        if title.chars().count() < self.min_title_len {
            debug!(title = %title, min = self.min_title_len, "Rejected short title");
            return Ok(None);
        }

        if filter {
            let container_text = element_text(card.container);
            if !self.is_on_topic(url.as_str(), &title, &container_text) {
                debug!(title = %truncate_for_log(&title, 80), "Rejected off-topic card");
                return Ok(None);
            }
        }

        Ok(Some(Candidate {
            published_at: find_timestamp(card.container, &self.time, card.time_depth),
            source: self.find_publisher(card, &title),
            title,
            url: url.to_string(),
        }))
    }

    /// OR across every keyword and every field, case-insensitive.
    fn is_on_topic(&self, url: &str, title: &str, container_text: &str) -> bool {
        let url = url.to_lowercase();
        let title = title.to_lowercase();
        let text = container_text.to_lowercase();
        self.keywords
            .iter()
            .any(|k| url.contains(k.as_str()) || title.contains(k.as_str()) || text.contains(k.as_str()))
    }

    fn find_publisher(&self, card: Card<'_>, title: &str) -> Option<String> {
        if let Some(selector) = &self.publisher {
            let marked = card
                .container
                .select(selector)
                .map(element_text)
                .find(|t| !t.is_empty());
            if marked.is_some() {
                return marked;
            }
        }
        if self.publisher_keywords.is_empty() {
            return None;
        }

        // Everything inside the card, then the card's direct siblings.
        let inside = card.container.select(&NEARBY_TEXT);
        let siblings = parent_element(card.container)
            .into_iter()
            .flat_map(|p| p.children().filter_map(ElementRef::wrap))
            .filter(|el| el.id() != card.container.id() && NEARBY_TEXT.matches(el));

        inside
            .chain(siblings)
            .map(element_text)
            .find(|text| self.looks_like_publisher(text, title))
    }

    fn looks_like_publisher(&self, text: &str, title: &str) -> bool {
        let len = text.chars().count();
        (MIN_PUBLISHER_LEN..MAX_PUBLISHER_LEN).contains(&len)
            && !text.contains(title)
            && self.publisher_keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

impl ExtractionStrategy for HeuristicExtractor {
    fn extract(&self, html: &str, page_url: &Url, filter: bool) -> Vec<Candidate> {
        let document = Html::parse_document(html);
        let cards = self.locate_cards(&document);
        if cards.is_empty() {
            warn!(source = %self.source_id, url = %page_url, "No article cards found on page");
            return Vec::new();
        }

        let mut candidates = Vec::with_capacity(cards.len());
        for card in cards {
            match self.candidate_from_card(card, page_url, filter) {
                Ok(Some(candidate)) => candidates.push(candidate),
                Ok(None) => {}
                Err(e) => warn!(source = %self.source_id, error = %e, "Skipping malformed card"),
            }
        }

        let identity = self.identity;
        let unique: Vec<Candidate> = candidates
            .into_iter()
            .unique_by(|c| identity.of_candidate(c))
            .collect();

        info!(
            source = %self.source_id,
            url = %page_url,
            count = unique.len(),
            filtered = filter,
            "Extracted candidates"
        );
        unique
    }
}

/// Visible text of an element with whitespace collapsed.
fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

fn parent_element(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.parent().and_then(ElementRef::wrap)
}

/// Resolve a listing href to an absolute http(s) URL.
///
/// Hrefs starting with `./` are treated as root-relative, so a page under
/// `/topics/...` linking `./read/abc` resolves to `/read/abc` on the same host.
pub fn resolve_href(page_url: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let rooted;
    let target = match href.strip_prefix("./") {
        Some(rest) => {
            rooted = format!("/{}", rest);
            rooted.as_str()
        }
        None => href,
    };
    let url = page_url.join(target).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Walk from `start` up through at most `depth` levels (counting `start`),
/// returning the first time element's `datetime` attribute or, failing
/// that, its text.
fn find_timestamp(start: ElementRef<'_>, time: &Selector, depth: usize) -> Option<String> {
    std::iter::once(start)
        .chain(start.ancestors().filter_map(ElementRef::wrap))
        .take(depth)
        .find_map(|scope| {
            let el = scope.select(time).next()?;
            el.value()
                .attr("datetime")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| {
                    let text = element_text(el);
                    (!text.is_empty()).then_some(text)
                })
        })
}
