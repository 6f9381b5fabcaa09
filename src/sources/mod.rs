//! Tech blog sources and the adapter contract they share.
//!
//! Every source implements [`SourceAdapter`]: given its [`SourceDescriptor`]
//! it produces a bounded, ordered list of [`RawRecord`]s. Two kinds exist:
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Naver D2 | [`d2`] | Rendered page | `.cont_post` cards |
//! | Kakao Tech | [`kakao`] | Rendered page | `.link_post` cards, dates normalized |
//! | Toss Tech | [`toss`] | Rendered page | Article links, no dates |
//! | Daangn | [`feed`] | RSS (Medium) | |
//! | Coupang | [`feed`] | RSS (Medium) | |
//! | RIDI | [`ridi`] | Rendered page | WordPress story listing |
//!
//! # Failure policy
//!
//! [`SourceAdapter::fetch`] never fails. Any error raised while loading or
//! parsing a source is logged and the source contributes nothing, so one
//! broken blog cannot abort the run.

use crate::config::Settings;
use crate::models::{RawRecord, SourceDescriptor};
use crate::normalize::make_absolute_url;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

pub mod d2;
pub mod extract;
pub mod feed;
pub mod kakao;
pub mod render;
pub mod ridi;
pub mod toss;

use feed::FeedSource;
use render::{RenderedSource, Renderer};

/// Identifiers of every registered source, in run order.
pub const SOURCE_IDS: [&str; 6] = ["d2", "kakao", "toss", "daangn", "coupang", "ridi"];

/// Errors raised while loading or parsing a single source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("timed out after {timeout:?} waiting for `{selector}` on {url}")]
    RenderTimeout {
        url: String,
        selector: String,
        timeout: Duration,
    },
    #[error("invalid CSS selector `{0}`")]
    Selector(String),
}

/// A blog or feed that yields candidate articles.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn descriptor(&self) -> &SourceDescriptor;

    /// Load the source and extract records in source order.
    async fn extract(&self) -> Result<Vec<RawRecord>, SourceError>;

    /// Extract, deduplicate and cap the source's records.
    ///
    /// Errors are logged here and turn into an empty list.
    async fn fetch(&self) -> Vec<RawRecord> {
        let descriptor = self.descriptor();
        info!(source = %descriptor.id, url = %descriptor.listing_url, "Fetching source");
        match self.extract().await {
            Ok(records) => {
                let records = finalize(records, descriptor);
                info!(source = %descriptor.id, count = records.len(), "Parsed source");
                records
            }
            Err(e) => {
                error!(source = %descriptor.id, error = %e, "Source fetch failed");
                Vec::new()
            }
        }
    }
}

/// Drop records without title or link, keep the first occurrence of each
/// absolute URL, then cap at `max_posts`.
pub fn finalize(records: Vec<RawRecord>, descriptor: &SourceDescriptor) -> Vec<RawRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| !record.is_blank())
        .filter(|record| seen.insert(make_absolute_url(&record.href, &descriptor.base_url)))
        .take(descriptor.max_posts)
        .collect()
}

/// All registered sources in their fixed run order.
///
/// Sources not listed in `settings.sources` are skipped when that list is
/// non-empty.
pub fn registry(
    settings: &Settings,
    renderer: Arc<dyn Renderer>,
    client: reqwest::Client,
) -> Vec<Box<dyn SourceAdapter>> {
    let configure = |descriptor: SourceDescriptor| {
        descriptor
            .with_max_posts(settings.max_posts_per_source)
            .with_render_timeout(settings.render_timeout())
    };

    let all: Vec<Box<dyn SourceAdapter>> = vec![
        Box::new(RenderedSource::new(
            configure(d2::descriptor()),
            renderer.clone(),
            d2::D2Layout,
        )),
        Box::new(RenderedSource::new(
            configure(kakao::descriptor()),
            renderer.clone(),
            kakao::KakaoLayout,
        )),
        Box::new(RenderedSource::new(
            configure(toss::descriptor()),
            renderer.clone(),
            toss::TossLayout,
        )),
        Box::new(FeedSource::new(configure(feed::daangn()), client.clone())),
        Box::new(FeedSource::new(configure(feed::coupang()), client)),
        Box::new(RenderedSource::new(
            configure(ridi::descriptor()),
            renderer,
            ridi::RidiLayout,
        )),
    ];

    all.into_iter()
        .filter(|source| {
            settings.sources.is_empty() || settings.sources.contains(&source.descriptor().id)
        })
        .collect()
}
