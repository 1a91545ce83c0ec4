//! HTML digest rendering for the email notifier.
//!
//! The digest lists every article of a source document, numbered, with a
//! `NEW TODAY` badge on the first `new_articles_today` entries (stores put
//! new articles first). All inserted text is HTML-escaped.

use crate::models::SourceDocument;
use crate::utils::parse_timestamp;
use chrono::{DateTime, Utc};
use std::fmt::Write;

const STYLE: &str = r#"
body{font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Arial,sans-serif;line-height:1.6;color:#333;max-width:800px;margin:0 auto;padding:20px;background:#f5f5f5;}
.container{background:#fff;border-radius:8px;box-shadow:0 2px 4px rgba(0,0,0,.1);overflow:hidden;}
.header{background:linear-gradient(135deg,#667eea 0%,#764ba2 100%);color:#fff;padding:30px;text-align:center;}
.header h1{margin:0;font-size:28px;}
.stats{background:#f8f9fa;padding:20px 30px;border-bottom:1px solid #e9ecef;text-align:center;}
.stat{display:inline-block;padding:10px 30px;}
.stat-number{font-size:32px;font-weight:bold;color:#667eea;}
.stat-label{font-size:14px;color:#6c757d;text-transform:uppercase;}
.content{padding:30px;}
.article{padding:20px 0;border-bottom:1px solid #e9ecef;}
.article-number{display:inline-block;background:#667eea;color:#fff;width:32px;height:32px;border-radius:50%;text-align:center;line-height:32px;font-weight:bold;margin-right:12px;}
.article-title{display:inline;font-size:18px;}
.article-title a{color:#2c3e50;text-decoration:none;}
.article-meta{font-size:13px;color:#6c757d;margin:8px 0 0 44px;}
.article-meta span{margin-right:15px;}
.badge-new{display:inline-block;padding:4px 12px;border-radius:12px;font-size:12px;font-weight:600;margin:8px 0 0 44px;background:#d4edda;color:#155724;}
.footer{background:#f8f9fa;padding:20px 30px;text-align:center;font-size:13px;color:#6c757d;}
"#;

/// Render `last_updated` as "February 17, 2026 at 05:34 AM UTC", or verbatim
/// when it does not parse.
pub fn format_last_updated(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|dt| dt.format("%B %d, %Y at %I:%M %p UTC").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Email subject line for a digest sent at `now`.
pub fn subject(doc: &SourceDocument, now: DateTime<Utc>) -> String {
    format!(
        "Daily Semiconductor News - {} New Articles ({})",
        doc.new_articles_today,
        now.format("%b %d, %Y")
    )
}

/// Render the digest for `doc`; `publisher` names the source in the header.
pub fn render_digest(doc: &SourceDocument, publisher: &str) -> String {
    let updated = html_escape(&format_last_updated(&doc.last_updated));
    let publisher = html_escape(publisher);

    let mut items = String::new();
    if doc.articles.is_empty() {
        items.push_str(r#"<p style="color:#888;text-align:center;">No articles were found in this run.</p>"#);
    }
    for (i, article) in doc.articles.iter().enumerate() {
        let number = i + 1;
        let _ = write!(
            items,
            r#"<div class="article"><div><span class="article-number">{number}</span><h3 class="article-title"><a href="{url}" target="_blank">{title}</a></h3></div><div class="article-meta">"#,
            url = html_escape(&article.url),
            title = html_escape(&article.title),
        );
        if !article.published_at.is_empty() {
            let _ = write!(
                items,
                "<span>&#128336; {}</span>",
                html_escape(&article.published_at)
            );
        }
        let _ = write!(
            items,
            "<span>&#128279; {}</span></div>",
            html_escape(&article.source)
        );
        if number <= doc.new_articles_today {
            items.push_str(r#"<div><span class="badge-new">NEW TODAY</span></div>"#);
        }
        items.push_str("</div>\n");
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Semiconductor News Update</title>
<style>{STYLE}</style>
</head>
<body>
<div class="container">
  <div class="header">
    <h1>Daily Semiconductor News</h1>
    <p>Your update from {publisher}</p>
    <p>{updated}</p>
  </div>
  <div class="stats">
    <div class="stat"><div class="stat-number">{total}</div><div class="stat-label">Total Articles</div></div>
    <div class="stat"><div class="stat-number">{new}</div><div class="stat-label">New Today</div></div>
  </div>
  <div class="content">
    <h2 style="margin-top:0;color:#2c3e50;">Latest Articles</h2>
{items}  </div>
  <div class="footer">
    <p><strong>Source:</strong> {publisher}</p>
    <p>Generated at {updated}</p>
  </div>
</div>
</body>
</html>"#,
        total = doc.total_articles,
        new = doc.new_articles_today,
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
