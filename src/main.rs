//! # Blog Weblinks
//!
//! Collects newly published posts from Korean tech company blogs and files
//! each one as a page in a Notion database, remembering what was already
//! filed so reruns only add new posts.
//!
//! ## Features
//!
//! - Crawls Naver D2, Kakao Tech, Toss Tech and RIDI listing pages plus the
//!   Daangn and Coupang Medium feeds
//! - Normalizes titles, links, excerpts and dates into one article shape
//! - Skips anything already recorded in an append-only URL cache file
//! - Creates Notion pages with rate-limit aware retries
//!
//! ## Usage
//!
//! ```sh
//! NOTION_API_KEY=secret blog_weblinks --config settings.yaml
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Fetching**: Each source loads its listing or feed and extracts records
//! 2. **Normalizing**: Records become articles with absolute URLs
//! 3. **Deduplicating**: Articles already in the URL cache are dropped
//! 4. **Publishing**: New articles are sent to Notion one by one; successes
//!    are appended to the cache

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cache;
mod cli;
mod config;
mod models;
mod normalize;
mod notion;
mod pipeline;
mod publish;
mod sources;
mod utils;

use cache::UrlCache;
use cli::Cli;
use config::Settings;
use notion::NotionPublisher;
use pipeline::Pipeline;
use publish::RetryPublisher;
use sources::render::HttpRenderer;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(20);
const PUBLISH_BASE_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("blog_weblinks starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.config, ?args.cache_file, ?args.only, args.dry_run, "Parsed CLI arguments");

    // --- Settings ---
    let mut settings = Settings::load(args.config.as_deref())
        .await
        .inspect_err(|e| error!(error = %e, "Failed to load settings"))?;
    settings.apply_cli(&args);
    settings
        .validate()
        .inspect_err(|e| error!(error = %e, "Invalid settings"))?;
    info!(
        cache_file = %settings.cache_file.display(),
        max_posts = settings.max_posts_per_source,
        sources = ?settings.sources,
        "Settings ready"
    );

    // --- Sources ---
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()?;
    let renderer = Arc::new(HttpRenderer::new(client.clone()));
    let sources = sources::registry(&settings, renderer, client);
    info!(count = sources.len(), "Sources registered");

    // --- Publisher ---
    let notion = NotionPublisher::new(args.notion_api_key.clone(), settings.notion_target())?
        .with_api_base(&settings.notion_api_base)
        .with_api_version(&settings.notion_api_version);
    if !notion.is_configured() && !args.dry_run {
        warn!("NOTION_API_KEY is not set; publishing will be simulated and nothing cached");
    }
    info!(
        database_id = %notion.target().database_id,
        tag = %notion.target().default_tag,
        configured = notion.is_configured(),
        "Notion publisher ready"
    );
    let publisher = RetryPublisher::new(notion, settings.publish_retries, PUBLISH_BASE_DELAY);

    // --- Run ---
    let mut cache = UrlCache::open(&settings.cache_file);
    debug!(path = ?cache.path(), "Using URL cache");
    let report = Pipeline::new(sources, publisher)
        .with_request_delay(settings.request_delay())
        .dry_run(args.dry_run)
        .run(&mut cache)
        .await?;

    println!("{report}");

    let elapsed = start_time.elapsed();
    info!(
        elapsed_secs = elapsed.as_secs_f64(),
        elapsed_ms = elapsed.as_millis() as u64,
        published = report.published,
        failed = report.failed,
        "Run complete"
    );

    Ok(())
}
