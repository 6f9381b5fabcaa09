//! Publishing abstraction with an exponential backoff decorator.
//!
//! # Architecture
//!
//! - [`Publisher`]: Core trait turning an [`Article`] into a durable remote record
//! - [`PublishError`]: Why a publish did not go through
//! - [`RetryPublisher`]: Decorator that retries transient failures of any `Publisher`
//!
//! # Retry Strategy
//!
//! Publishing creates a remote record, so a call is only repeated when it
//! provably created nothing: the connection was never established, or the
//! API answered HTTP 429. Timeouts, dropped responses and 5xx answers may
//! hide an accepted request and fail immediately, as do a missing
//! credential and a rejected payload.
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use crate::models::Article;
use async_trait::async_trait;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// Why an article was not published.
///
/// The pipeline treats every variant the same way (the article stays out of
/// the cache and is retried next run); the detail is for diagnostics.
#[derive(Debug, Error)]
pub enum PublishError {
    /// No credential configured; the call was simulated, not attempted.
    #[error("no API token configured; publish simulated")]
    NotConfigured,
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl PublishError {
    /// Whether the call can be repeated without risking a duplicate record.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NotConfigured => false,
            Self::Transport(e) => e.is_connect(),
            Self::Status { status, .. } => *status == 429,
        }
    }

    /// Whether this is the no-credential path rather than a real failure.
    pub fn is_simulated(&self) -> bool {
        matches!(self, Self::NotConfigured)
    }
}

/// Something that can durably record an article in an external system.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `article`; `Ok` means the remote system accepted it.
    async fn publish(&self, article: &Article) -> Result<(), PublishError>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for Box<P> {
    async fn publish(&self, article: &Article) -> Result<(), PublishError> {
        (**self).publish(article).await
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Publisher`].
pub struct RetryPublisher<P> {
    inner: P,
    /// Retries after the first attempt.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Cap on a single backoff delay.
    max_delay: Duration,
}

impl<P> RetryPublisher<P>
where
    P: Publisher,
{
    /// Wrap `inner`, retrying transient failures up to `max_retries` times.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let notion = NotionPublisher::new(token, target)?;
    /// let publisher = RetryPublisher::new(notion, 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: P, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = (attempt - 1).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<P> fmt::Debug for RetryPublisher<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPublisher")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

#[async_trait]
impl<P> Publisher for RetryPublisher<P>
where
    P: Publisher,
{
    #[instrument(level = "debug", skip_all, fields(url = %article.url()))]
    async fn publish(&self, article: &Article) -> Result<(), PublishError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.publish(article).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "publish exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "publish attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
