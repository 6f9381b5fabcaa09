//! Toss Tech (`https://toss.tech/category/engineering`).
//!
//! Posts are plain `a[href^="/article/"]` links whose text lines hold, in
//! order, a category, some metadata, the title and the excerpt. The listing
//! shows no dates.

use super::extract::{attr, css, text_lines};
use super::render::PageLayout;
use crate::models::{RawRecord, SourceDescriptor};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

pub const LISTING_URL: &str = "https://toss.tech/category/engineering";

static ARTICLE_LINK: Lazy<Selector> = Lazy::new(|| css(r#"a[href^="/article/"]"#));

pub fn descriptor() -> SourceDescriptor {
    SourceDescriptor::page("Toss", "toss", LISTING_URL)
}

/// Pick title and excerpt out of a card's text lines.
///
/// Four or more lines: third and fourth. Two or three: first and second.
/// One line: title only.
pub fn title_and_summary(lines: &[String]) -> (String, String) {
    match lines.len() {
        n if n >= 4 => (lines[2].clone(), lines[3].clone()),
        2 | 3 => (lines[0].clone(), lines[1].clone()),
        1 => (lines[0].clone(), String::new()),
        _ => (String::new(), String::new()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TossLayout;

impl PageLayout for TossLayout {
    fn wait_selector(&self) -> &'static str {
        r#"a[href^="/article/"]"#
    }

    fn parse(&self, document: &Html) -> Vec<RawRecord> {
        document
            .select(&ARTICLE_LINK)
            .filter_map(|link| {
                let href = attr(link, "href");
                if !href.contains("/article/") {
                    return None;
                }
                let (title, summary) = title_and_summary(&text_lines(link));
                if title.chars().count() < 3 {
                    return None;
                }
                Some(RawRecord::new(title, href).with_summary(summary))
            })
            .collect()
    }
}
