//! Small helpers shared by the scrapers and the output writers.
//!
//! - Whitespace normalization for text pulled out of HTML
//! - String truncation for log fields
//! - Timestamps in the format written to every document
//! - Output directory validation

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::Result;

/// Collapse runs of whitespace into single spaces and trim the ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(collapse_whitespace("  Nvidia\n   beats  "), "Nvidia beats");
/// ```
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped characters appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Current UTC time as an RFC 3339 string with microsecond precision.
pub fn now_iso8601() -> String {
    to_iso8601(Utc::now())
}

pub fn to_iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp written by this tool or by the older naive-UTC writer.
///
/// Accepts RFC 3339 (`2026-02-17T05:34:00Z`) and naive ISO-8601
/// (`2026-02-17T05:34:00.123456`, assumed UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    fs::write(&probe_path, b"").await?;
    let _ = fs::remove_file(&probe_path).await;
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Nvidia\n   beats \t estimates "), "Nvidia beats estimates");
        assert_eq!(collapse_whitespace("\n\t "), "");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.ends_with("…(+400 chars)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let s = "芯片芯片芯片";
        assert_eq!(truncate_for_log(s, 2), "芯片…(+4 chars)");
    }

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let dt = parse_timestamp("2026-02-17T05:34:00Z").unwrap();
        assert_eq!(dt.year(), 2026);
        assert_eq!(dt.hour(), 5);
    }

    #[test]
    fn test_parse_timestamp_naive() {
        let dt = parse_timestamp("2026-02-17T05:34:00.123456").unwrap();
        assert_eq!(dt.day(), 17);
        assert_eq!(dt.minute(), 34);
    }

    #[test]
    fn test_parse_timestamp_rejects_relative_text() {
        assert!(parse_timestamp("2 days ago").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_now_round_trips_through_parser() {
        let now = now_iso8601();
        assert!(now.ends_with('Z'));
        assert!(parse_timestamp(&now).is_some());
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested() {
        let tmp = tempfile::TempDir::new().unwrap();
        let nested = tmp.path().join("a/b/c");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__probe_write__").exists());
    }
}
