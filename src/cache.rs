//! Identity cache of article URLs that were already published.
//!
//! The durable form is a plain UTF-8 text file with one absolute URL per
//! line. The file is append-only: entries are never rewritten or removed,
//! and blank lines are ignored on read.
//!
//! # Durability
//!
//! [`UrlCache::add`] appends, flushes and syncs the line before returning, so
//! a URL is only reported as stored once it is on disk. There is no close
//! step; dropping the cache loses nothing.
//!
//! # Concurrency
//!
//! One process, one writer. Overlapping runs must be prevented by whatever
//! schedules them.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// Default location of the cache file, relative to the working directory.
pub const DEFAULT_CACHE_FILE: &str = "notion_urls_cache.txt";

/// Failure reading or appending the cache file.
///
/// These are treated as fatal: swallowing them would make every article look
/// new and republish the whole backlog.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read URL cache {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to append to URL cache {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug)]
enum Backing {
    File(PathBuf),
    Memory,
}

/// Set of canonical URLs already published.
#[derive(Debug)]
pub struct UrlCache {
    backing: Backing,
    urls: HashSet<String>,
    loaded: bool,
}

impl UrlCache {
    /// Cache backed by the file at `path`. Nothing is read until [`load`](Self::load).
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Backing::File(path.into()),
            urls: HashSet::new(),
            loaded: false,
        }
    }

    /// Empty cache that never touches the filesystem.
    pub fn in_memory() -> Self {
        Self::seeded(std::iter::empty::<String>())
    }

    /// In-memory cache pre-populated with `urls`.
    pub fn seeded<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            backing: Backing::Memory,
            urls: urls.into_iter().map(Into::into).collect(),
            loaded: true,
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File(path) => Some(path),
            Backing::Memory => None,
        }
    }

    /// Read the backing file once. Later calls return the loaded set.
    ///
    /// A missing file is an empty cache.
    #[instrument(level = "debug", skip(self))]
    pub async fn load(&mut self) -> Result<&HashSet<String>, CacheError> {
        if !self.loaded {
            if let Backing::File(path) = &self.backing {
                self.urls = match fs::read_to_string(path).await {
                    Ok(contents) => contents
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty())
                        .map(str::to_string)
                        .collect(),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {
                        info!(path = %path.display(), "No URL cache yet; starting empty");
                        HashSet::new()
                    }
                    Err(source) => {
                        return Err(CacheError::Read {
                            path: path.clone(),
                            source,
                        });
                    }
                };
                debug!(path = %path.display(), count = self.urls.len(), "Loaded URL cache");
            }
            self.loaded = true;
        }
        Ok(&self.urls)
    }

    pub async fn contains(&mut self, url: &str) -> Result<bool, CacheError> {
        Ok(self.load().await?.contains(url))
    }

    /// Record `url` as published.
    ///
    /// Returns `false` when it was already present. Otherwise the URL is
    /// appended as one line and synced to disk before this returns.
    pub async fn add(&mut self, url: &str) -> Result<bool, CacheError> {
        if self.load().await?.contains(url) {
            return Ok(false);
        }
        if let Backing::File(path) = &self.backing {
            append_line(path, url)
                .await
                .map_err(|source| CacheError::Write {
                    path: path.clone(),
                    source,
                })?;
        }
        self.urls.insert(url.to_string());
        Ok(true)
    }

    pub async fn size(&mut self) -> Result<usize, CacheError> {
        Ok(self.load().await?.len())
    }
}

async fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await?;
    file.sync_data().await
}
