//! RSS 2.0 / Atom feed sources.
//!
//! [`parse_feed`] is a forgiving streaming reader: entries that were complete
//! before a syntax error are kept, so a truncated or slightly broken feed
//! still yields what it can. A document with nothing recoverable simply
//! produces no entries.
//!
//! # Dates
//!
//! Each entry's `published` (or `pubDate`) and `updated` texts are parsed as
//! RFC 3339 or RFC 2822 timestamps. When neither parses, a handful of looser
//! layouts is tried on the raw text, and failing that the entry is dated
//! today.

use super::{SourceAdapter, SourceError};
use crate::models::{RawRecord, SourceDescriptor};
use crate::normalize::clean_summary;
use crate::utils::{DATE_FORMAT, today_stamp};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use tracing::{debug, instrument, warn};

pub fn daangn() -> SourceDescriptor {
    SourceDescriptor::feed(
        "Daangn",
        "daangn",
        "https://medium.com/daangn",
        "https://medium.com/feed/daangn",
    )
}

pub fn coupang() -> SourceDescriptor {
    SourceDescriptor::feed(
        "Coupang",
        "coupang",
        "https://medium.com/@coupang-engineering-kr",
        "https://medium.com/feed/@coupang-engineering-kr",
    )
}

/// One `<item>` or `<entry>` as found in the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// `description`/`summary`, falling back to the full content.
    pub summary: String,
    /// Structured timestamp from `published`/`pubDate`, else `updated`.
    pub published: Option<DateTime<FixedOffset>>,
    /// Raw date text the timestamp came from (or failed to come from).
    pub published_text: String,
}

#[derive(Debug, Default)]
struct EntryBuilder {
    title: String,
    link: String,
    summary: String,
    content: String,
    published: String,
    updated: String,
}

impl EntryBuilder {
    fn is_usable(&self) -> bool {
        !self.title.trim().is_empty() && !self.link.trim().is_empty()
    }

    fn build(self) -> FeedEntry {
        let published = parse_timestamp(&self.published).or_else(|| parse_timestamp(&self.updated));
        let published_text = if self.published.is_empty() {
            self.updated
        } else {
            self.published
        };
        FeedEntry {
            title: self.title,
            link: self.link,
            summary: if self.summary.is_empty() {
                self.content
            } else {
                self.summary
            },
            published,
            published_text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Summary,
    Content,
    Published,
    Updated,
}

impl Field {
    fn from_name(local_name: &[u8]) -> Option<Self> {
        match local_name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"description" | b"summary" => Some(Self::Summary),
            b"encoded" | b"content" => Some(Self::Content),
            b"pubDate" | b"published" => Some(Self::Published),
            b"updated" | b"date" => Some(Self::Updated),
            _ => None,
        }
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_rfc2822(text))
        .ok()
}

/// Atom `<link href="..."/>` target, ignoring non-alternate relations.
fn atom_href(element: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    for attribute in element.attributes().flatten() {
        match attribute.key.local_name().as_ref() {
            b"href" => href = Some(String::from_utf8_lossy(&attribute.value).into_owned()),
            b"rel" if attribute.value.as_ref() != b"alternate" => return None,
            _ => {}
        }
    }
    href.map(|h| html_escape::decode_html_entities(&h).into_owned())
}

/// Parse an RSS or Atom document into entries in document order.
pub fn parse_feed(xml: &str) -> Vec<FeedEntry> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    // Field being captured and the nesting depth inside it.
    let mut field: Option<(Field, usize)> = None;
    let mut text = String::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    error = %e,
                    salvaged = entries.len(),
                    "Feed is malformed; keeping entries read so far"
                );
                if let Some(entry) = current.take().filter(EntryBuilder::is_usable) {
                    entries.push(entry.build());
                }
                break;
            }
        };

        match event {
            Event::Start(start) => {
                let name = start.local_name();
                let name = name.as_ref();
                if let Some((_, depth)) = field.as_mut() {
                    *depth += 1;
                } else if name == b"item" || name == b"entry" {
                    current = Some(EntryBuilder::default());
                } else if let Some(entry) = current.as_mut() {
                    if let Some(f) = Field::from_name(name) {
                        if f == Field::Link {
                            if let Some(href) = atom_href(&start) {
                                if entry.link.is_empty() {
                                    entry.link = href;
                                }
                            }
                        }
                        field = Some((f, 0));
                        text.clear();
                    }
                }
            }
            Event::Empty(start) => {
                if field.is_none() && start.local_name().as_ref() == b"link" {
                    if let (Some(entry), Some(href)) = (current.as_mut(), atom_href(&start)) {
                        if entry.link.is_empty() {
                            entry.link = href;
                        }
                    }
                }
            }
            Event::Text(t) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::CData(t) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::GeneralRef(r) => {
                if field.is_some() {
                    text.push('&');
                    text.push_str(&String::from_utf8_lossy(&r));
                    text.push(';');
                }
            }
            Event::End(end) => match field {
                Some((f, 0)) => {
                    if let Some(entry) = current.as_mut() {
                        let value = html_escape::decode_html_entities(text.trim()).into_owned();
                        let slot = match f {
                            Field::Title => &mut entry.title,
                            Field::Link => &mut entry.link,
                            Field::Summary => &mut entry.summary,
                            Field::Content => &mut entry.content,
                            Field::Published => &mut entry.published,
                            Field::Updated => &mut entry.updated,
                        };
                        if slot.is_empty() {
                            *slot = value;
                        }
                    }
                    field = None;
                    text.clear();
                }
                Some((f, depth)) => field = Some((f, depth - 1)),
                None => {
                    let name = end.local_name();
                    if name.as_ref() == b"item" || name.as_ref() == b"entry" {
                        if let Some(entry) = current.take() {
                            entries.push(entry.build());
                        }
                    }
                }
            },
            Event::Eof => {
                if let Some(entry) = current.take().filter(EntryBuilder::is_usable) {
                    warn!("Feed ended inside an entry; keeping it");
                    entries.push(entry.build());
                }
                break;
            }
            _ => {}
        }
    }

    debug!(count = entries.len(), "Parsed feed entries");
    entries
}

/// Parse date text that is not a strict RFC 2822/3339 timestamp.
pub fn parse_loose_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text).or_else(|_| DateTime::parse_from_rfc3339(text)) {
        return Some(dt.naive_utc().date());
    }

    // Drop a trailing zone name ("GMT", "UTC", "KST") and try common layouts.
    let trimmed = match text.rsplit_once(' ') {
        Some((head, zone)) if zone.chars().all(|c| c.is_ascii_alphabetic()) => head,
        _ => text,
    };
    const DATETIME_LAYOUTS: [&str; 4] = [
        "%a, %d %b %Y %H:%M:%S",
        "%d %b %Y %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
    ];
    for layout in DATETIME_LAYOUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Some(dt.date());
        }
    }
    const DATE_LAYOUTS: [&str; 4] = ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d", "%d %b %Y"];
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(trimmed, layout).ok())
}

/// `YYYY.MM.DD` for an entry: structured timestamp, then loose text, then today.
pub fn entry_date(entry: &FeedEntry) -> String {
    if let Some(published) = entry.published {
        return published.naive_utc().format(DATE_FORMAT).to_string();
    }
    match parse_loose_date(&entry.published_text) {
        Some(date) => date.format(DATE_FORMAT).to_string(),
        None => today_stamp(),
    }
}

/// Map a feed entry onto a raw record with a cleaned summary and resolved date.
pub fn entry_to_record(entry: &FeedEntry) -> RawRecord {
    RawRecord::new(entry.title.trim(), entry.link.trim())
        .with_summary(clean_summary(&entry.summary))
        .with_date(entry_date(entry))
}

/// [`SourceAdapter`] that downloads and parses a syndication feed.
#[derive(Debug, Clone)]
pub struct FeedSource {
    descriptor: SourceDescriptor,
    client: Client,
}

impl FeedSource {
    pub fn new(descriptor: SourceDescriptor, client: Client) -> Self {
        Self { descriptor, client }
    }
}

#[async_trait]
impl SourceAdapter for FeedSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    #[instrument(level = "debug", skip_all, fields(source = %self.descriptor.id))]
    async fn extract(&self) -> Result<Vec<RawRecord>, SourceError> {
        let url = &self.descriptor.listing_url;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;

        let entries = parse_feed(&body);
        if entries.is_empty() {
            warn!(source = %self.descriptor.id, "Feed yielded no entries");
        }
        Ok(entries.iter().map(entry_to_record).collect())
    }
}
