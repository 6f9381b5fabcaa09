//! Kakao Tech (`https://tech.kakao.com/blog`).
//!
//! Posts are `.link_post` anchors wrapping `.tit_post`, `.desc_post` and
//! `.txt_date`. Dates show up as `2024.05.01`, `2024-05-01` or `2024/05/01`
//! and are normalized to dots.

use super::extract::{attr, css, first_text};
use super::render::PageLayout;
use crate::models::{RawRecord, SourceDescriptor};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

pub const LISTING_URL: &str = "https://tech.kakao.com/blog";

static CARD: Lazy<Selector> = Lazy::new(|| css(".link_post"));
static TITLE: Lazy<Selector> = Lazy::new(|| css(".tit_post"));
static SUMMARY: Lazy<Selector> = Lazy::new(|| css(".desc_post"));
static DATE: Lazy<Selector> = Lazy::new(|| css(".txt_date"));
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}[.\-/]\d{2}[.\-/]\d{2})").expect("valid regex"));

pub fn descriptor() -> SourceDescriptor {
    SourceDescriptor::page("Kakao", "kakao", LISTING_URL)
}

/// Pull a `YYYY.MM.DD` date out of free-form date text.
pub fn normalize_date(text: &str) -> String {
    DATE_RE
        .captures(text)
        .map(|caps| caps[1].replace(['-', '/'], "."))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KakaoLayout;

impl PageLayout for KakaoLayout {
    fn wait_selector(&self) -> &'static str {
        ".link_post"
    }

    fn parse(&self, document: &Html) -> Vec<RawRecord> {
        document
            .select(&CARD)
            .filter_map(|card| {
                let title = first_text(card, &TITLE);
                if title.chars().count() < 3 {
                    return None;
                }
                Some(
                    RawRecord::new(title, attr(card, "href"))
                        .with_summary(first_text(card, &SUMMARY))
                        .with_date(normalize_date(&first_text(card, &DATE))),
                )
            })
            .collect()
    }
}
