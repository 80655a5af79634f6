//! Feed fetching and normalization.
//!
//! For each source, every configured feed URL is fetched, parsed into raw
//! entries and normalized into [`FeedRecord`]s in the run's reference zone.
//!
//! # Failure handling
//!
//! | Failure | Effect |
//! |---------|--------|
//! | URL unreachable / non-2xx / not a feed | that URL contributes nothing |
//! | Entry without title or link | entry skipped |
//! | Timestamp not in the source's format | entry skipped |
//!
//! All of these are logged; none of them fail the run.

pub mod document;
pub mod qiita;
pub mod zenn;

use crate::error::DigestError;
use crate::http::PageFetcher;
use crate::models::{FeedRecord, Source};
use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use document::RawEntry;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use tracing::{debug, error, info, instrument, warn};

/// Parse a raw timestamp using the rules of `source`.
pub fn parse_published(source: Source, raw: &str, tz: Tz) -> Result<DateTime<Tz>, DigestError> {
    match source {
        Source::Qiita => qiita::parse_published(raw, tz),
        Source::Zenn => zenn::parse_published(raw, tz),
    }
}

/// Turn raw entries into records and keep those newer than `cutoff`.
///
/// The reference zone is taken from `cutoff`, which is derived from the
/// run's start instant.
pub fn normalize_entries(
    entries: Vec<RawEntry>,
    source: Source,
    cutoff: &DateTime<Tz>,
) -> Vec<FeedRecord> {
    let tz = cutoff.timezone();
    let mut records = Vec::with_capacity(entries.len());

    for entry in entries {
        let (Some(title), Some(link)) = (entry.title, entry.link) else {
            warn!(%source, "Skipping feed entry without title or link");
            continue;
        };
        let raw = entry.published.unwrap_or_default();
        let published = match parse_published(source, &raw, tz) {
            Ok(dt) => dt,
            Err(e) => {
                warn!(%source, %title, error = %e, "Skipping feed entry with unparseable timestamp");
                continue;
            }
        };
        if published > *cutoff {
            records.push(FeedRecord {
                title,
                link,
                published,
                source,
            });
        } else {
            debug!(%source, %title, %published, "Entry outside lookback window");
        }
    }

    records
}

/// Fetch one feed URL; failures are logged and yield no records.
#[instrument(level = "info", skip(fetcher, source, cutoff), fields(%source))]
async fn fetch_feed<F: PageFetcher>(
    fetcher: &F,
    url: &str,
    source: Source,
    cutoff: &DateTime<Tz>,
) -> Vec<FeedRecord> {
    let body = match fetcher.get_text(url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(%url, error = %e, "Feed fetch failed; skipping feed");
            return Vec::new();
        }
    };
    let entries = match document::parse_document(&body) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(%url, error = %e, "Feed document could not be parsed; skipping feed");
            return Vec::new();
        }
    };

    let total = entries.len();
    let records = normalize_entries(entries, source, cutoff);
    info!(%url, total, fresh = records.len(), "Parsed feed");
    records
}

/// Fetch every feed of one source and return its fresh, de-duplicated entries.
///
/// # Arguments
///
/// * `fetcher` - HTTP collaborator
/// * `feed_urls` - Feed URLs configured for `source`; their entries are unioned
/// * `source` - Determines the timestamp format
/// * `lookback_hours` - Width of the freshness window
/// * `now` - Run start instant, captured once by the caller
///
/// # Returns
///
/// Records with `published > now - lookback_hours`, exact duplicates removed,
/// first-seen order kept.
#[instrument(level = "info", skip(fetcher, feed_urls, now), fields(feeds = feed_urls.len()))]
pub async fn fetch<F: PageFetcher>(
    fetcher: &F,
    feed_urls: &[String],
    source: Source,
    lookback_hours: i64,
    now: DateTime<Tz>,
) -> Vec<FeedRecord> {
    let Some(cutoff) =
        Duration::try_hours(lookback_hours).and_then(|window| now.checked_sub_signed(window))
    else {
        error!(%source, lookback_hours, "Lookback window is out of range; skipping source");
        return Vec::new();
    };

    let per_feed: Vec<Vec<FeedRecord>> = stream::iter(feed_urls)
        .then(|url| fetch_feed(fetcher, url, source, &cutoff))
        .collect()
        .await;

    let records: Vec<FeedRecord> = per_feed.into_iter().flatten().unique().collect();
    info!(%source, count = records.len(), "Fetched fresh feed entries");
    records
}
