//! Conversion of raw scraped records into canonical [`Article`] values.
//!
//! Normalization is pure: it absolutizes the link against the source's base
//! URL, strips markup from the summary, trims and caps text fields, and
//! defaults a missing date to today.
//! Records without a title or link are rejected.

use crate::models::{Article, RawRecord, SourceDescriptor};
use crate::utils::{collapse_whitespace, today_stamp, truncate_with_ellipsis};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Longest summary kept on an [`Article`].
pub const SUMMARY_MAX_CHARS: usize = 500;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Resolve `href` against the scheme and host of `base_url`.
///
/// Absolute links pass through, root-relative links (leading `/`) are joined
/// with the base origin, and anything else is returned unchanged.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     make_absolute_url("/posts/123", "https://example.com/blog"),
///     "https://example.com/posts/123"
/// );
/// ```
pub fn make_absolute_url(href: &str, base_url: &str) -> String {
    let href = href.trim();
    if href.starts_with("http") {
        return href.to_string();
    }
    if href.starts_with('/') {
        if let Ok(base) = Url::parse(base_url) {
            if base.has_host() {
                return format!("{}{}", base.origin().ascii_serialization(), href);
            }
        }
    }
    href.to_string()
}

/// Turn an HTML-laden excerpt into plain text of at most 500 characters.
///
/// Tags are removed, entities decoded, whitespace collapsed, and overlong
/// text cut to 497 characters followed by `...`.
pub fn clean_summary(raw: &str) -> String {
    let without_tags = TAG_RE.replace_all(raw, "");
    let decoded = html_escape::decode_html_entities(&without_tags);
    truncate_with_ellipsis(&collapse_whitespace(&decoded), SUMMARY_MAX_CHARS)
}

/// Validate a raw record and build the canonical article.
///
/// Returns `None` when the title or the absolutized URL is empty.
pub fn normalize(record: &RawRecord, descriptor: &SourceDescriptor) -> Option<Article> {
    let title = collapse_whitespace(&record.title);
    let url = make_absolute_url(&record.href, &descriptor.base_url);
    if title.is_empty() || url.is_empty() {
        return None;
    }

    let summary = clean_summary(&record.summary);
    let date = match record.date.trim() {
        "" => today_stamp(),
        date => date.to_string(),
    };

    Some(Article::new(title, url, summary, date, descriptor.id.clone()))
}
