//! Command-line interface definitions for Blog Weblinks.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every flag overrides the matching field of the optional YAML settings
//! file; the Notion token and database id can also come from the environment.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Blog Weblinks application.
///
/// # Examples
///
/// ```sh
/// # Publish everything new, token from the environment
/// NOTION_API_KEY=secret blog_weblinks
///
/// # Only look at two sources and list what would be added
/// blog_weblinks --only d2 --only kakao --dry-run
///
/// # Settings file plus a different cache location
/// blog_weblinks -c settings.yaml --cache-file /var/lib/blog_weblinks/cache.txt
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Notion integration token; without it publishing is simulated
    #[arg(long, env = "NOTION_API_KEY", hide_env_values = true)]
    pub notion_api_key: Option<String>,

    /// Notion database that receives new pages
    #[arg(long, env = "NOTION_DATABASE_ID")]
    pub database_id: Option<String>,

    /// File holding URLs that were already published
    #[arg(long)]
    pub cache_file: Option<PathBuf>,

    /// Value for the database's Tags select property
    #[arg(long)]
    pub default_tag: Option<String>,

    /// Maximum number of posts taken from each source
    #[arg(long)]
    pub max_posts: Option<usize>,

    /// Pause between Notion API calls, in milliseconds
    #[arg(long)]
    pub request_delay_ms: Option<u64>,

    /// How long to wait for a rendered listing, in milliseconds
    #[arg(long)]
    pub render_timeout_ms: Option<u64>,

    /// Only crawl the given source id (repeatable)
    #[arg(long = "only", value_name = "SOURCE_ID")]
    pub only: Vec<String>,

    /// List new articles without publishing them
    #[arg(long)]
    pub dry_run: bool,
}
