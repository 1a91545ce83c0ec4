//! Output stages: per-source persistence, the combined feed, and the HTML
//! digest.
//!
//! # Submodules
//!
//! - [`store`]: Reads and writes one source's JSON document (replace or merge)
//! - [`combined`]: Merges every source document into the combined feed
//! - [`digest`]: Renders a source document as an HTML email body
//!
//! # Output Structure
//!
//! ```text
//! data_dir/
//! ├── semiconductor_news.json            # CNBC
//! ├── google_news_semiconductor.json     # Google News topic
//! └── combined_semiconductor_news.json   # aggregated feed
//! ```

pub mod combined;
pub mod digest;
pub mod store;
