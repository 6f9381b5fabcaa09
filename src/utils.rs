//! Utility functions for dates, string truncation and whitespace handling.
//!
//! This module provides helper functions used throughout the application:
//! - Today's date in the `YYYY.MM.DD` form articles carry
//! - Character-safe truncation for summaries and log previews
//! - Whitespace collapsing for scraped text

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Format used for article dates.
pub const DATE_FORMAT: &str = "%Y.%m.%d";

/// Today's local date formatted as `YYYY.MM.DD`.
pub fn today_stamp() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

/// Collapse runs of whitespace (including newlines) to a single space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RE.replace_all(s, " ").trim().to_string()
}

/// Keep at most `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Cap `s` at `max` characters, ending in `...` when anything was cut.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_with_ellipsis("abcdef", 5), "ab...");
/// assert_eq!(truncate_with_ellipsis("abc", 5), "abc");
/// ```
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out = truncate_chars(s, max.saturating_sub(3));
        out.push_str("...");
        out
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() == s.len() {
        head
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}
