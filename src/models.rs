//! Data models flowing through the digest pipeline.
//!
//! Each stage produces a strict superset of the previous stage's record:
//! - [`FeedRecord`]: one normalized feed entry
//! - [`ScrapedRecord`]: a feed record plus the article's extracted content
//! - [`SummarizedRecord`]: a scraped record plus the LLM summary
//!
//! Records are built by composition, so the originating fields are carried
//! through unchanged.

use crate::error::DigestError;
use chrono::DateTime;
use chrono_tz::Tz;
use std::fmt;
use std::str::FromStr;

/// The feed sources the digest knows how to fetch and scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Qiita: Atom feeds, ISO-8601 timestamps, raw markdown endpoint.
    Qiita,
    /// Zenn: RSS feeds, RFC-822 timestamps, rendered HTML only.
    Zenn,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Qiita => "qiita",
            Source::Zenn => "zenn",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qiita" => Ok(Source::Qiita),
            "zenn" => Ok(Source::Zenn),
            other => Err(DigestError::InvalidFeedData(format!(
                "unknown source {other:?}"
            ))),
        }
    }
}

/// A single feed entry, normalized to the reference timezone.
///
/// Two records are equal only when every field matches; that is what the
/// per-source exact-duplicate pass relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedRecord {
    /// The entry title. Dedup across sources groups on this.
    pub title: String,
    /// The article URL.
    pub link: String,
    /// Publication instant in the run's reference timezone.
    pub published: DateTime<Tz>,
    /// Which feed family produced this entry.
    pub source: Source,
}

/// A feed record with the content extracted from its article page.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedRecord {
    pub feed: FeedRecord,
    /// Article tags in page order.
    pub tags: Vec<String>,
    /// Open-Graph preview image, when the page declares one.
    pub image_url: Option<String>,
    /// Article body text. Empty when the content selector misses.
    pub content: String,
    pub author: String,
}

/// A scraped record with its summary attached; the notifier's input.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizedRecord {
    pub scraped: ScrapedRecord,
    pub summary: String,
}

impl SummarizedRecord {
    pub fn title(&self) -> &str {
        &self.scraped.feed.title
    }

    pub fn link(&self) -> &str {
        &self.scraped.feed.link
    }
}
