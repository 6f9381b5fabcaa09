//! Naver D2 (`https://d2.naver.com/helloworld`).
//!
//! Each post is a `.cont_post` card: the `h2 a` link carries title and href,
//! `.post_txt` the excerpt, and the first `dl dd` the date.

use super::extract::{attr, css, first_text, inner_text};
use super::render::PageLayout;
use crate::models::{RawRecord, SourceDescriptor};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

pub const LISTING_URL: &str = "https://d2.naver.com/helloworld";

static CARD: Lazy<Selector> = Lazy::new(|| css(".cont_post"));
static LINK: Lazy<Selector> = Lazy::new(|| css("h2 a"));
static SUMMARY: Lazy<Selector> = Lazy::new(|| css(".post_txt"));
static DATE: Lazy<Selector> = Lazy::new(|| css("dl dd"));

pub fn descriptor() -> SourceDescriptor {
    SourceDescriptor::page("D2", "d2", LISTING_URL)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct D2Layout;

impl PageLayout for D2Layout {
    fn wait_selector(&self) -> &'static str {
        ".cont_post"
    }

    fn parse(&self, document: &Html) -> Vec<RawRecord> {
        document
            .select(&CARD)
            .filter_map(|card| {
                let link = card.select(&LINK).next()?;
                Some(
                    RawRecord::new(inner_text(link), attr(link, "href"))
                        .with_summary(first_text(card, &SUMMARY))
                        .with_date(first_text(card, &DATE)),
                )
            })
            .collect()
    }
}
