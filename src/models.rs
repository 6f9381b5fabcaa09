//! Data models for scraped records, canonical articles and source descriptors.
//!
//! This module defines the core data structures used throughout the application:
//! - [`RawRecord`]: Unvalidated fields as a source adapter scraped them
//! - [`Article`]: Canonical, validated article keyed by its absolute URL
//! - [`SourceDescriptor`]: Static description of one blog or feed

use std::time::Duration;

/// Default number of records considered per source.
pub const DEFAULT_MAX_POSTS: usize = 10;

/// Default time to wait for a rendered listing to show its content marker.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_millis(15_000);

/// A raw record as extracted from a listing page or a feed entry.
///
/// Every field is best-effort: a sub-field the adapter could not find is an
/// empty string. Validation happens later in [`crate::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// Title text as displayed by the source.
    pub title: String,
    /// Link target, possibly relative to the source's base URL.
    pub href: String,
    /// Excerpt text, may be empty.
    pub summary: String,
    /// Date text in whatever shape the source uses, may be empty.
    pub date: String,
}

impl RawRecord {
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
            ..Self::default()
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// A record missing its title or link can never become an [`Article`].
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() || self.href.trim().is_empty()
    }
}

/// A canonical article ready for deduplication and publishing.
///
/// The `url` is always absolute and is the article's identity: two articles
/// are the same entity iff their URLs are byte-equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    title: String,
    url: String,
    summary: String,
    date: String,
    source: String,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        summary: impl Into<String>,
        date: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            summary: summary.into(),
            date: date.into(),
            source: source.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Publication date as `YYYY.MM.DD`.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Display label such as `[D2]`.
    pub fn label(&self) -> String {
        let source = if self.source.is_empty() { "?" } else { &self.source };
        format!("[{}]", source.to_uppercase())
    }
}

/// Static description of one source.
///
/// Rendered sources load `listing_url` and wait for a content marker; feed
/// sources download `listing_url` as RSS or Atom. `base_url` is what
/// relative links are resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    /// Human-readable name (e.g. "D2").
    pub name: String,
    /// Short identifier used for provenance (e.g. "d2").
    pub id: String,
    /// Site URL that relative hrefs are resolved against.
    pub base_url: String,
    /// Listing page or feed document to load.
    pub listing_url: String,
    /// Maximum number of records returned per run.
    pub max_posts: usize,
    /// Upper bound on waiting for a rendered listing.
    pub render_timeout: Duration,
}

impl SourceDescriptor {
    /// Descriptor for a page whose listing lives at its base URL.
    pub fn page(name: &str, id: &str, url: &str) -> Self {
        Self::feed(name, id, url, url)
    }

    /// Descriptor for a site whose listing is a separate feed document.
    pub fn feed(name: &str, id: &str, base_url: &str, feed_url: &str) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
            base_url: base_url.to_string(),
            listing_url: feed_url.to_string(),
            max_posts: DEFAULT_MAX_POSTS,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    pub fn with_max_posts(mut self, max_posts: usize) -> Self {
        self.max_posts = max_posts;
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_builder() {
        let record = RawRecord::new("Title", "/posts/1")
            .with_summary("Summary")
            .with_date("2025.01.02");
        assert_eq!(record.title, "Title");
        assert_eq!(record.href, "/posts/1");
        assert_eq!(record.summary, "Summary");
        assert_eq!(record.date, "2025.01.02");
        assert!(!record.is_blank());
    }

    #[test]
    fn test_raw_record_blank() {
        assert!(RawRecord::new("  ", "/x").is_blank());
        assert!(RawRecord::new("Title", "").is_blank());
        assert!(RawRecord::default().is_blank());
    }

    #[test]
    fn test_article_label() {
        let article = Article::new("T", "https://d2.naver.com/1", "", "2025.01.01", "d2");
        assert_eq!(article.label(), "[D2]");

        let anonymous = Article::new("T", "https://a.example/1", "", "", "");
        assert_eq!(anonymous.label(), "[?]");
    }

    #[test]
    fn test_descriptor_defaults() {
        let page = SourceDescriptor::page("D2", "d2", "https://d2.naver.com/helloworld");
        assert_eq!(page.base_url, page.listing_url);
        assert_eq!(page.max_posts, DEFAULT_MAX_POSTS);
        assert_eq!(page.render_timeout, DEFAULT_RENDER_TIMEOUT);

        let feed = SourceDescriptor::feed(
            "Daangn",
            "daangn",
            "https://medium.com/daangn",
            "https://medium.com/feed/daangn",
        )
        .with_max_posts(3)
        .with_render_timeout(Duration::from_secs(1));
        assert_eq!(feed.base_url, "https://medium.com/daangn");
        assert_eq!(feed.listing_url, "https://medium.com/feed/daangn");
        assert_eq!(feed.max_posts, 3);
        assert_eq!(feed.render_timeout, Duration::from_secs(1));
    }
}
