//! Rendered-page sources.
//!
//! Some blogs build their listing with JavaScript, so a plain download may
//! not contain the posts yet. The [`Renderer`] collaborator hides how a page
//! gets rendered: it loads a URL, waits until a content marker matches, and
//! hands back the document markup. Element queries then run over that markup
//! with CSS selectors, one [`PageLayout`] per site.

use super::{SourceAdapter, SourceError};
use crate::models::{RawRecord, SourceDescriptor};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, instrument};

/// Loads a page and waits for its content to appear.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Return the markup of `url` once `wait_for` matches an element.
    ///
    /// Fails with [`SourceError::RenderTimeout`] when the marker does not show
    /// up within `limit`.
    async fn render(&self, url: &str, wait_for: &str, limit: Duration) -> Result<String, SourceError>;
}

/// Whether `html` contains an element matching the CSS selector `css`.
pub fn has_marker(html: &str, css: &str) -> Result<bool, SourceError> {
    let selector = Selector::parse(css).map_err(|_| SourceError::Selector(css.to_string()))?;
    Ok(Html::parse_document(html).select(&selector).next().is_some())
}

/// [`Renderer`] that polls the served markup over HTTP until the marker
/// appears (server-side rendered or prerendered listings).
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
    poll_interval: Duration,
}

impl HttpRenderer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn download(&self, url: &str) -> Result<String, SourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    #[instrument(level = "debug", skip(self))]
    async fn render(&self, url: &str, wait_for: &str, limit: Duration) -> Result<String, SourceError> {
        let poll = async {
            let mut attempt = 0usize;
            loop {
                attempt += 1;
                let html = self.download(url).await?;
                if has_marker(&html, wait_for)? {
                    debug!(attempt, bytes = html.len(), "Content marker found");
                    return Ok::<String, SourceError>(html);
                }
                debug!(attempt, "Content marker not present yet");
                sleep(self.poll_interval).await;
            }
        };

        timeout(limit, poll)
            .await
            .map_err(|_| SourceError::RenderTimeout {
                url: url.to_string(),
                selector: wait_for.to_string(),
                timeout: limit,
            })?
    }
}

/// Site-specific structure of a rendered listing.
pub trait PageLayout: Send + Sync {
    /// Selector whose presence means the listing has rendered.
    fn wait_selector(&self) -> &'static str;

    /// Extract records from the rendered document in document order.
    fn parse(&self, document: &Html) -> Vec<RawRecord>;
}

/// [`SourceAdapter`] for a page loaded through a [`Renderer`].
pub struct RenderedSource<L> {
    descriptor: SourceDescriptor,
    renderer: Arc<dyn Renderer>,
    layout: L,
}

impl<L: PageLayout> RenderedSource<L> {
    pub fn new(descriptor: SourceDescriptor, renderer: Arc<dyn Renderer>, layout: L) -> Self {
        Self {
            descriptor,
            renderer,
            layout,
        }
    }
}

/// Parse `html` and run `layout` over it.
pub fn parse_listing<L: PageLayout + ?Sized>(layout: &L, html: &str) -> Vec<RawRecord> {
    let document = Html::parse_document(html);
    layout.parse(&document)
}

#[async_trait]
impl<L: PageLayout> SourceAdapter for RenderedSource<L> {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn extract(&self) -> Result<Vec<RawRecord>, SourceError> {
        let html = self
            .renderer
            .render(
                &self.descriptor.listing_url,
                self.layout.wait_selector(),
                self.descriptor.render_timeout,
            )
            .await?;
        Ok(parse_listing(&self.layout, &html))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serves canned markup per URL; unknown URLs fail like a navigation error.
    #[derive(Debug, Default)]
    pub(crate) struct FixtureRenderer {
        pages: HashMap<String, String>,
    }

    impl FixtureRenderer {
        pub(crate) fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }
    }

    #[async_trait]
    impl Renderer for FixtureRenderer {
        async fn render(&self, url: &str, wait_for: &str, limit: Duration) -> Result<String, SourceError> {
            match self.pages.get(url) {
                Some(html) if has_marker(html, wait_for)? => Ok(html.clone()),
                _ => Err(SourceError::RenderTimeout {
                    url: url.to_string(),
                    selector: wait_for.to_string(),
                    timeout: limit,
                }),
            }
        }
    }

    #[test]
    fn test_has_marker() {
        let html = r#"<div class="cont_post"><h2><a href="/x">X</a></h2></div>"#;
        assert!(has_marker(html, ".cont_post").unwrap());
        assert!(!has_marker(html, ".missing").unwrap());
        assert!(matches!(has_marker(html, "[["), Err(SourceError::Selector(_))));
    }

    #[tokio::test]
    async fn test_http_renderer_returns_page_with_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"<ul><li class="post">A</li></ul>"#),
            )
            .mount(&server)
            .await;

        let renderer = HttpRenderer::new(Client::new());
        let html = renderer
            .render(&format!("{}/blog", server.uri()), ".post", Duration::from_secs(5))
            .await
            .unwrap();
        assert!(html.contains("class=\"post\""));
    }

    #[tokio::test]
    async fn test_http_renderer_times_out_without_marker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<div id=\"app\"></div>"))
            .mount(&server)
            .await;

        let renderer = HttpRenderer::new(Client::new()).with_poll_interval(Duration::from_millis(20));
        let err = renderer
            .render(&format!("{}/blog", server.uri()), ".post", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::RenderTimeout { .. }));
    }

    #[tokio::test]
    async fn test_http_renderer_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blog"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let renderer = HttpRenderer::new(Client::new());
        let err = renderer
            .render(&format!("{}/blog", server.uri()), ".post", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 404, .. }));
    }
}
