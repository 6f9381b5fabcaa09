//! Runtime settings.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! command-line flags and environment variables.
//!
//! ```yaml
//! cache_file: /var/lib/blog_weblinks/cache.txt
//! default_tag: Articles
//! max_posts_per_source: 10
//! request_delay_ms: 300
//! sources: [d2, kakao]
//! ```

use crate::cache::DEFAULT_CACHE_FILE;
use crate::cli::Cli;
use crate::models::{DEFAULT_MAX_POSTS, DEFAULT_RENDER_TIMEOUT};
use crate::notion::{DEFAULT_DATABASE_ID, DEFAULT_TAG, NOTION_API_BASE, NOTION_API_VERSION, NotionTarget};
use crate::sources::SOURCE_IDS;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Append-only file of already published URLs.
    pub cache_file: PathBuf,
    pub notion_api_base: String,
    pub notion_api_version: String,
    pub database_id: String,
    /// Value of the Tags select property on new pages.
    pub default_tag: String,
    pub max_posts_per_source: usize,
    /// Pause between successive publish calls.
    pub request_delay_ms: u64,
    pub render_timeout_ms: u64,
    /// Extra attempts for rate-limited or failing API calls.
    pub publish_retries: usize,
    /// Source ids to crawl; empty means all.
    pub sources: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            notion_api_base: NOTION_API_BASE.to_string(),
            notion_api_version: NOTION_API_VERSION.to_string(),
            database_id: DEFAULT_DATABASE_ID.to_string(),
            default_tag: DEFAULT_TAG.to_string(),
            max_posts_per_source: DEFAULT_MAX_POSTS,
            request_delay_ms: 300,
            render_timeout_ms: DEFAULT_RENDER_TIMEOUT.as_millis() as u64,
            publish_retries: 2,
            sources: Vec::new(),
        }
    }
}

impl Settings {
    /// Defaults overlaid with the YAML file at `path`, if given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let settings = Self::from_yaml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Overlay command-line flags.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(path) = &cli.cache_file {
            self.cache_file = path.clone();
        }
        if let Some(id) = &cli.database_id {
            self.database_id = id.clone();
        }
        if let Some(tag) = &cli.default_tag {
            self.default_tag = tag.clone();
        }
        if let Some(max) = cli.max_posts {
            self.max_posts_per_source = max;
        }
        if let Some(ms) = cli.request_delay_ms {
            self.request_delay_ms = ms;
        }
        if let Some(ms) = cli.render_timeout_ms {
            self.render_timeout_ms = ms;
        }
        if !cli.only.is_empty() {
            self.sources = cli.only.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_posts_per_source == 0 {
            return Err(ConfigError::Invalid(
                "max_posts_per_source must be at least 1".to_string(),
            ));
        }
        if self.database_id.trim().is_empty() {
            return Err(ConfigError::Invalid("database_id is empty".to_string()));
        }
        if let Some(unknown) = self
            .sources
            .iter()
            .find(|id| !SOURCE_IDS.contains(&id.as_str()))
        {
            return Err(ConfigError::Invalid(format!(
                "unknown source `{unknown}` (known: {})",
                SOURCE_IDS.join(", ")
            )));
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    pub fn notion_target(&self) -> NotionTarget {
        NotionTarget {
            database_id: self.database_id.clone(),
            default_tag: self.default_tag.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.cache_file, PathBuf::from("notion_urls_cache.txt"));
        assert_eq!(settings.max_posts_per_source, 10);
        assert_eq!(settings.request_delay(), Duration::from_millis(300));
        assert_eq!(settings.render_timeout(), Duration::from_millis(15_000));
        assert_eq!(settings.default_tag, "Articles");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let settings = Settings::from_yaml("default_tag: Blogs\nsources: [d2, toss]\n").unwrap();
        assert_eq!(settings.default_tag, "Blogs");
        assert_eq!(settings.sources, ["d2", "toss"]);
        assert_eq!(settings.max_posts_per_source, 10);
        assert_eq!(settings.notion_api_version, "2022-06-28");
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Settings::from_yaml("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut settings = Settings::from_yaml("max_posts_per_source: 3\ndefault_tag: Blogs\n").unwrap();
        let cli = Cli::parse_from(["blog_weblinks", "--max-posts", "7", "--only", "kakao"]);
        settings.apply_cli(&cli);
        assert_eq!(settings.max_posts_per_source, 7);
        assert_eq!(settings.default_tag, "Blogs");
        assert_eq!(settings.sources, ["kakao"]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero = Settings {
            max_posts_per_source: 0,
            ..Settings::default()
        };
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid(_))));

        let unknown = Settings {
            sources: vec!["medium".to_string()],
            ..Settings::default()
        };
        let err = unknown.validate().unwrap_err();
        assert!(err.to_string().contains("medium"));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "request_delay_ms: 50\n").unwrap();

        let settings = Settings::load(Some(&path)).await.unwrap();
        assert_eq!(settings.request_delay(), Duration::from_millis(50));

        let missing = Settings::load(Some(&dir.path().join("nope.yaml"))).await;
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        std::fs::write(&path, "max_posts_per_source: [1, 2]\n").unwrap();
        assert!(matches!(
            Settings::load(Some(&path)).await,
            Err(ConfigError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_without_file() {
        assert_eq!(Settings::load(None).await.unwrap(), Settings::default());
    }
}
