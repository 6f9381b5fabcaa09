//! One crawl-and-publish run.
//!
//! Sources are fetched in registry order, records are normalized into
//! [`Article`]s, anything whose URL is already cached is dropped, and the rest
//! is published one article at a time. A URL enters the cache only after its
//! publish succeeded, so a failed article is picked up again next run.

use crate::cache::{CacheError, UrlCache};
use crate::models::Article;
use crate::normalize::normalize;
use crate::publish::Publisher;
use crate::sources::SourceAdapter;
use crate::utils::truncate_with_ellipsis;
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Default pause between publish calls.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(300);

const PREVIEW_CHARS: usize = 100;

/// Counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Articles that survived normalization, across all sources.
    pub discovered: usize,
    /// Discovered articles whose URL was not cached.
    pub new: usize,
    pub published: usize,
    pub failed: usize,
    /// Failures caused by a missing API token (subset of `failed`).
    pub simulated: usize,
    /// Sources that contributed no records.
    pub empty_sources: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "discovered {}, new {}, published {}, failed {}",
            self.discovered, self.new, self.published, self.failed
        )?;
        if self.simulated > 0 {
            write!(f, " ({} simulated)", self.simulated)?;
        }
        if self.empty_sources > 0 {
            write!(f, "; {} source(s) returned nothing", self.empty_sources)?;
        }
        Ok(())
    }
}

/// Articles whose URL is not in `known`, order preserved.
pub fn filter_new(articles: Vec<Article>, known: &HashSet<String>) -> Vec<Article> {
    articles
        .into_iter()
        .filter(|article| !known.contains(article.url()))
        .collect()
}

pub struct Pipeline<P> {
    sources: Vec<Box<dyn SourceAdapter>>,
    publisher: P,
    request_delay: Duration,
    dry_run: bool,
}

impl<P: Publisher> Pipeline<P> {
    pub fn new(sources: Vec<Box<dyn SourceAdapter>>, publisher: P) -> Self {
        Self {
            sources,
            publisher,
            request_delay: DEFAULT_REQUEST_DELAY,
            dry_run: false,
        }
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// List new articles but publish nothing.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Fetch every source and normalize its records, in source order.
    async fn collect(&self, report: &mut RunReport) -> Vec<Article> {
        let mut articles = Vec::new();
        for source in &self.sources {
            let descriptor = source.descriptor();
            let records = source.fetch().await;
            if records.is_empty() {
                warn!(source = %descriptor.id, "Source returned no articles");
                report.empty_sources += 1;
                continue;
            }
            let before = articles.len();
            for record in &records {
                match normalize(record, descriptor) {
                    Some(article) => articles.push(article),
                    None => debug!(source = %descriptor.id, href = %record.href, "Dropped unusable record"),
                }
            }
            debug!(
                source = %descriptor.id,
                records = records.len(),
                articles = articles.len() - before,
                "Normalized source"
            );
        }
        articles
    }

    /// Run once against `cache`.
    ///
    /// Only cache failures abort the run; source and publish failures are
    /// logged and counted.
    #[instrument(level = "info", skip_all, fields(sources = self.sources.len(), dry_run = self.dry_run))]
    pub async fn run(&self, cache: &mut UrlCache) -> Result<RunReport, CacheError> {
        let t0 = Instant::now();
        let mut report = RunReport::default();

        let cached = cache.load().await.inspect_err(|e| error!(error = %e, "Cannot load URL cache"))?;
        info!(cached = cached.len(), "URL cache ready");

        let discovered = self.collect(&mut report).await;
        report.discovered = discovered.len();
        if discovered.is_empty() {
            warn!("No articles collected from any source");
            return Ok(report);
        }

        let fresh = filter_new(discovered, cache.load().await?);
        report.new = fresh.len();
        if fresh.is_empty() {
            info!(discovered = report.discovered, "No new articles");
            return Ok(report);
        }

        let per_source = fresh
            .iter()
            .map(Article::label)
            .dedup_with_count()
            .map(|(count, label)| format!("{label} {count}"))
            .join(", ");
        info!(new = fresh.len(), %per_source, "New articles found");
        print_listing(&fresh);

        if self.dry_run {
            info!("Dry run; nothing published");
            return Ok(report);
        }

        for (i, article) in fresh.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                sleep(self.request_delay).await;
            }
            match self.publisher.publish(article).await {
                Ok(()) => {
                    cache
                        .add(article.url())
                        .await
                        .inspect_err(|e| error!(error = %e, url = %article.url(), "Cannot record published URL"))?;
                    report.published += 1;
                    info!(url = %article.url(), title = %article.title(), "Published");
                }
                Err(e) if e.is_simulated() => {
                    report.failed += 1;
                    report.simulated += 1;
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(url = %article.url(), error = %e, "Publish failed; will retry next run");
                }
            }
        }

        info!(
            published = report.published,
            failed = report.failed,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Publishing finished"
        );
        Ok(report)
    }
}

fn print_listing(articles: &[Article]) {
    println!("{} new article(s):", articles.len());
    for article in articles {
        println!("{} {}", article.label(), article.title());
        println!("    date:    {}", article.date());
        println!("    url:     {}", article.url());
        if !article.summary().is_empty() {
            println!(
                "    summary: {}",
                truncate_with_ellipsis(article.summary(), PREVIEW_CHARS)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawRecord, SourceDescriptor};
    use crate::notion::{NotionPublisher, NotionTarget};
    use crate::publish::PublishError;
    use crate::sources::SourceError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct StaticSource {
        descriptor: SourceDescriptor,
        records: Option<Vec<RawRecord>>,
    }

    impl StaticSource {
        fn new(id: &str, base: &str, records: Vec<RawRecord>) -> Box<dyn SourceAdapter> {
            Box::new(Self {
                descriptor: SourceDescriptor::page(id, id, base),
                records: Some(records),
            })
        }

        fn broken(id: &str) -> Box<dyn SourceAdapter> {
            Box::new(Self {
                descriptor: SourceDescriptor::page(id, id, "https://broken.example"),
                records: None,
            })
        }
    }

    #[async_trait]
    impl SourceAdapter for StaticSource {
        fn descriptor(&self) -> &SourceDescriptor {
            &self.descriptor
        }

        async fn extract(&self) -> Result<Vec<RawRecord>, SourceError> {
            self.records.clone().ok_or_else(|| SourceError::Status {
                url: self.descriptor.listing_url.clone(),
                status: 500,
            })
        }
    }

    /// Records every published URL and when it was published; fails for
    /// URLs in `reject`.
    #[derive(Default)]
    struct Recording {
        published: Mutex<Vec<(String, Instant)>>,
        reject: HashSet<String>,
    }

    impl Recording {
        fn rejecting(urls: &[&str]) -> Self {
            Self {
                reject: urls.iter().map(|u| u.to_string()).collect(),
                ..Self::default()
            }
        }

        fn urls(&self) -> Vec<String> {
            self.published.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
        }

        fn stamps(&self) -> Vec<Instant> {
            self.published.lock().unwrap().iter().map(|(_, at)| *at).collect()
        }
    }

    #[async_trait]
    impl Publisher for Recording {
        async fn publish(&self, article: &Article) -> Result<(), PublishError> {
            if self.reject.contains(article.url()) {
                return Err(PublishError::Status {
                    status: 400,
                    body: "rejected".to_string(),
                });
            }
            self.published
                .lock()
                .unwrap()
                .push((article.url().to_string(), Instant::now()));
            Ok(())
        }
    }

    fn two_sources() -> Vec<Box<dyn SourceAdapter>> {
        vec![
            StaticSource::new(
                "a",
                "https://a.example",
                vec![
                    RawRecord::new("T1", "https://a.example/1"),
                    RawRecord::new("T2", "/2").with_date("2025.03.01"),
                ],
            ),
            StaticSource::new(
                "b",
                "https://b.example",
                vec![RawRecord::new("T3", "https://b.example/3").with_summary("Third")],
            ),
        ]
    }

    fn pipeline<P: Publisher>(sources: Vec<Box<dyn SourceAdapter>>, publisher: P) -> Pipeline<P> {
        Pipeline::new(sources, publisher).with_request_delay(Duration::ZERO)
    }

    fn article(url: &str) -> Article {
        Article::new("T", url, "", "2025.01.01", "a")
    }

    #[test]
    fn test_filter_new_keeps_order() {
        let known: HashSet<String> = ["A".to_string()].into_iter().collect();
        let fresh = filter_new(vec![article("A"), article("B"), article("C")], &known);
        let urls: Vec<_> = fresh.iter().map(Article::url).collect();
        assert_eq!(urls, ["B", "C"]);
    }

    #[test]
    fn test_report_display() {
        let report = RunReport {
            discovered: 5,
            new: 3,
            published: 1,
            failed: 2,
            simulated: 2,
            empty_sources: 0,
        };
        assert_eq!(
            report.to_string(),
            "discovered 5, new 3, published 1, failed 2 (2 simulated)"
        );

        let quiet = RunReport {
            empty_sources: 2,
            ..RunReport::default()
        };
        assert_eq!(
            quiet.to_string(),
            "discovered 0, new 0, published 0, failed 0; 2 source(s) returned nothing"
        );
    }

    #[tokio::test]
    async fn test_end_to_end_with_file_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.txt");
        std::fs::write(&path, "https://a.example/1\n").unwrap();

        let pipeline = pipeline(two_sources(), Recording::default());
        let mut cache = UrlCache::open(&path);
        let report = pipeline.run(&mut cache).await.unwrap();

        assert_eq!(report.discovered, 3);
        assert_eq!(report.new, 2);
        assert_eq!(report.published, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(
            pipeline.publisher.urls(),
            ["https://a.example/2", "https://b.example/3"]
        );
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "https://a.example/1\nhttps://a.example/2\nhttps://b.example/3\n"
        );
    }

    #[tokio::test]
    async fn test_second_run_publishes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.txt");

        let first = pipeline(two_sources(), Recording::default());
        let report = first.run(&mut UrlCache::open(&path)).await.unwrap();
        assert_eq!(report.published, 3);

        let second = pipeline(two_sources(), Recording::default());
        let report = second.run(&mut UrlCache::open(&path)).await.unwrap();
        assert_eq!(report.new, 0);
        assert_eq!(report.published, 0);
        assert!(second.publisher.urls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_publish_stays_out_of_cache() {
        let pipeline = pipeline(two_sources(), Recording::rejecting(&["https://a.example/2"]));
        let mut cache = UrlCache::in_memory();
        let report = pipeline.run(&mut cache).await.unwrap();

        assert_eq!(report.published, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.simulated, 0);
        assert!(!cache.contains("https://a.example/2").await.unwrap());
        assert!(cache.contains("https://b.example/3").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_token_simulates_every_publish() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.txt");
        std::fs::write(&path, "https://a.example/1\n").unwrap();

        let notion = NotionPublisher::new(None, NotionTarget::default()).unwrap();
        let pipeline = pipeline(two_sources(), notion);
        let report = pipeline.run(&mut UrlCache::open(&path)).await.unwrap();

        assert_eq!(report.new, 2);
        assert_eq!(report.published, 0);
        assert_eq!(report.failed, 2);
        assert_eq!(report.simulated, 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "https://a.example/1\n");
    }

    #[tokio::test]
    async fn test_broken_source_does_not_stop_run() {
        let sources = vec![
            StaticSource::broken("down"),
            StaticSource::new("up", "https://up.example", vec![RawRecord::new("Up", "/p/1")]),
        ];
        let pipeline = pipeline(sources, Recording::default());
        let report = pipeline.run(&mut UrlCache::in_memory()).await.unwrap();

        assert_eq!(report.discovered, 1);
        assert_eq!(report.empty_sources, 1);
        assert_eq!(pipeline.publisher.urls(), ["https://up.example/p/1"]);
    }

    #[tokio::test]
    async fn test_unusable_records_are_dropped() {
        let sources = vec![StaticSource::new(
            "a",
            "https://a.example",
            vec![
                RawRecord::new("   ", "/blank-title"),
                RawRecord::new("Kept", "/kept"),
            ],
        )];
        let pipeline = pipeline(sources, Recording::default());
        let report = pipeline.run(&mut UrlCache::in_memory()).await.unwrap();
        assert_eq!(report.discovered, 1);
        assert_eq!(pipeline.publisher.urls(), ["https://a.example/kept"]);
    }

    #[tokio::test]
    async fn test_delay_only_between_publishes() {
        let delay = Duration::from_millis(150);
        let pipeline = Pipeline::new(two_sources(), Recording::default()).with_request_delay(delay);
        let report = pipeline.run(&mut UrlCache::in_memory()).await.unwrap();
        let finished = Instant::now();

        assert_eq!(report.published, 3);
        let stamps = pipeline.publisher.stamps();
        assert_eq!(stamps.len(), 3);
        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= delay);
        }
        // No pause after the last article.
        assert!(finished - stamps[2] < delay);
    }

    #[tokio::test]
    async fn test_same_url_from_two_sources_is_published_twice() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.txt");
        let sources = vec![
            StaticSource::new("a", "https://a.example", vec![RawRecord::new("Shared", "https://shared.example/1")]),
            StaticSource::new("b", "https://b.example", vec![RawRecord::new("Shared again", "https://shared.example/1")]),
        ];

        let pipeline = pipeline(sources, Recording::default());
        let report = pipeline.run(&mut UrlCache::open(&path)).await.unwrap();

        assert_eq!(report.new, 2);
        assert_eq!(report.published, 2);
        assert_eq!(
            pipeline.publisher.urls(),
            ["https://shared.example/1", "https://shared.example/1"]
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "https://shared.example/1\n");
    }

    #[tokio::test]
    async fn test_dry_run_publishes_nothing() {
        let pipeline = pipeline(two_sources(), Recording::default()).dry_run(true);
        let mut cache = UrlCache::seeded(["https://a.example/1"]);
        let report = pipeline.run(&mut cache).await.unwrap();

        assert_eq!(report.new, 2);
        assert_eq!(report.published, 0);
        assert!(pipeline.publisher.urls().is_empty());
        assert_eq!(cache.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_nothing_discovered() {
        let sources = vec![
            StaticSource::broken("down"),
            StaticSource::new("quiet", "https://quiet.example", Vec::new()),
        ];
        let pipeline = pipeline(sources, Recording::default());
        let report = pipeline.run(&mut UrlCache::in_memory()).await.unwrap();
        assert_eq!(
            report,
            RunReport {
                empty_sources: 2,
                ..RunReport::default()
            }
        );
        assert!(pipeline.publisher.urls().is_empty());
    }
}
