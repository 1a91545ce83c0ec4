//! Error taxonomy for the crawl pipeline.
//!
//! Every variant maps to a containment scope: fetch errors are absorbed per
//! listing URL, parse errors per card, persistence errors per document, and
//! configuration/transport errors end only the notifier step.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, NewsError>;

#[derive(Error, Debug)]
pub enum NewsError {
    /// Network failure, timeout, or non-success HTTP status.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// A card or page did not have the shape the extractor expected.
    #[error("parse error: {0}")]
    Parse(String),

    /// A JSON document could not be read or written.
    #[error("persistence error at {path}: {reason}")]
    Persistence { path: String, reason: String },

    /// Missing or invalid configuration (credentials, selectors, config file).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The email transport refused or failed to deliver.
    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl NewsError {
    pub fn fetch(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        NewsError::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn persistence(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        NewsError::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let e = NewsError::fetch("https://www.cnbc.com/semiconductors/", "timed out");
        assert_eq!(
            e.to_string(),
            "fetch failed for https://www.cnbc.com/semiconductors/: timed out"
        );
    }

    #[test]
    fn test_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: NewsError = err.into();
        assert!(matches!(e, NewsError::Json(_)));
    }
}
