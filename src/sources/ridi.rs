//! RIDI tech blog (`https://ridicorp.com/story-category/tech-blog/`).
//!
//! A WordPress listing whose markup has shifted over time, so title, excerpt
//! and date are looked up through ordered lists of candidate selectors.

use super::extract::{attr, css, first_text_where, text_lines};
use super::render::PageLayout;
use crate::models::{RawRecord, SourceDescriptor};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

pub const LISTING_URL: &str = "https://ridicorp.com/story-category/tech-blog/";

static ARTICLE: Lazy<Selector> = Lazy::new(|| css("article"));
static ENTRY_META: Lazy<Selector> = Lazy::new(|| css(".entry-meta"));
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| css(".entry-title a"));
static STORY_LINK: Lazy<Selector> = Lazy::new(|| css(r#"a[href*="/story/"]"#));

static TITLE_CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".entry-title",
        "h2",
        "h3",
        ".story-card__title",
        ".story-item__title",
        ".card__title",
        ".title",
        r#"[class*="title"]"#,
    ]
    .into_iter()
    .map(css)
    .collect()
});

static SUMMARY_CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".entry-summary",
        "p",
        ".story-card__desc",
        ".story-item__desc",
        ".card__desc",
        ".summary",
        r#"[class*="desc"]"#,
    ]
    .into_iter()
    .map(css)
    .collect()
});

static DATE_CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [".entry-date", "time", ".date", ".post-date", r#"[class*="date"]"#]
        .into_iter()
        .map(css)
        .collect()
});

pub fn descriptor() -> SourceDescriptor {
    SourceDescriptor::page("RIDI", "ridi", LISTING_URL)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RidiLayout;

impl RidiLayout {
    fn parse_container(container: ElementRef<'_>) -> Option<RawRecord> {
        let link = container
            .select(&TITLE_LINK)
            .next()
            .or_else(|| container.select(&STORY_LINK).next())?;

        let mut title = first_text_where(container, &TITLE_CANDIDATES, |_| true);
        if title.is_empty() {
            title = text_lines(link).into_iter().next().unwrap_or_default();
        }
        if title.chars().count() < 3 {
            return None;
        }

        let summary = first_text_where(container, &SUMMARY_CANDIDATES, |t| t.chars().count() > 10);
        let date = first_text_where(container, &DATE_CANDIDATES, |_| true);

        Some(
            RawRecord::new(title, attr(link, "href"))
                .with_summary(summary)
                .with_date(date),
        )
    }
}

impl PageLayout for RidiLayout {
    fn wait_selector(&self) -> &'static str {
        ".entry-meta"
    }

    fn parse(&self, document: &Html) -> Vec<RawRecord> {
        let mut containers: Vec<ElementRef<'_>> = document
            .select(&ARTICLE)
            .map(|article| article.select(&ENTRY_META).next().unwrap_or(article))
            .collect();
        if containers.is_empty() {
            containers = document.select(&ENTRY_META).collect();
        }

        containers
            .into_iter()
            .filter_map(Self::parse_container)
            .collect()
    }
}
