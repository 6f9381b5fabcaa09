//! Notion API client that files articles into a weblinks database.
//!
//! Each [`Article`] becomes one page in the configured database:
//!
//! | Property | Notion type | Source |
//! |----------|-------------|--------|
//! | `Name` | title | article title |
//! | `URL` | url | canonical URL |
//! | `Tags` | select | configured default tag |
//! | `Summary` | rich_text | summary, first 2000 characters, omitted when empty |
//! | `Published Date` | date | `YYYY.MM.DD` rewritten to `YYYY-MM-DD`, omitted when empty |
//!
//! Without a token the client never touches the network: every publish is
//! logged as simulated and reported as [`PublishError::NotConfigured`].

use crate::models::Article;
use crate::publish::{PublishError, Publisher};
use crate::utils::{truncate_chars, truncate_for_log};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

pub const NOTION_API_BASE: &str = "https://api.notion.com";
pub const NOTION_API_VERSION: &str = "2022-06-28";
pub const DEFAULT_DATABASE_ID: &str = "89728ea5-acb0-423c-b047-14ef6ce4ca83";
pub const DEFAULT_TAG: &str = "Articles";

/// Longest text Notion accepts in a single rich text object.
pub const RICH_TEXT_LIMIT: usize = 2000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where pages are created and how they are tagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotionTarget {
    pub database_id: String,
    pub default_tag: String,
}

impl Default for NotionTarget {
    fn default() -> Self {
        Self {
            database_id: DEFAULT_DATABASE_ID.to_string(),
            default_tag: DEFAULT_TAG.to_string(),
        }
    }
}

/// Build the `POST /v1/pages` body for `article`.
pub fn page_payload(article: &Article, target: &NotionTarget) -> Value {
    let mut properties = json!({
        "Name": {
            "title": [{ "text": { "content": article.title() } }]
        },
        "URL": {
            "url": article.url()
        },
        "Tags": {
            "select": { "name": target.default_tag }
        },
    });

    if !article.summary().is_empty() {
        properties["Summary"] = json!({
            "rich_text": [{ "text": { "content": truncate_chars(article.summary(), RICH_TEXT_LIMIT) } }]
        });
    }

    if !article.date().is_empty() {
        properties["Published Date"] = json!({
            "date": { "start": article.date().replace('.', "-") }
        });
    }

    json!({
        "parent": {
            "type": "database_id",
            "database_id": target.database_id,
        },
        "properties": properties,
    })
}

/// [`Publisher`] backed by the Notion pages API.
#[derive(Debug, Clone)]
pub struct NotionPublisher {
    client: Client,
    token: Option<String>,
    api_base: String,
    api_version: String,
    timeout: Duration,
    target: NotionTarget,
}

impl NotionPublisher {
    /// Create a client; a blank or absent `token` leaves it unconfigured.
    pub fn new(token: Option<String>, target: NotionTarget) -> Result<Self, PublishError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            token: token.filter(|t| !t.trim().is_empty()),
            api_base: NOTION_API_BASE.to_string(),
            api_version: NOTION_API_VERSION.to_string(),
            timeout: REQUEST_TIMEOUT,
            target,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    pub fn target(&self) -> &NotionTarget {
        &self.target
    }
}

#[async_trait]
impl Publisher for NotionPublisher {
    #[instrument(level = "info", skip_all, fields(url = %article.url()))]
    async fn publish(&self, article: &Article) -> Result<(), PublishError> {
        let Some(token) = &self.token else {
            warn!(title = %article.title(), "Notion API token missing; simulating publish");
            return Err(PublishError::NotConfigured);
        };

        let payload = page_payload(article, &self.target);
        let endpoint = format!("{}/v1/pages", self.api_base);
        debug!(%endpoint, "Creating Notion page");

        let response = match self
            .client
            .post(&endpoint)
            .bearer_auth(token)
            .header("Notion-Version", &self.api_version)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Notion request failed");
                return Err(e.into());
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        error!(
            status = status.as_u16(),
            body = %truncate_for_log(&body, 300),
            "Notion API error"
        );
        Err(PublishError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
