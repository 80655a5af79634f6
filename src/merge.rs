//! Cross-source merge and title deduplication.

use crate::models::FeedRecord;
use itertools::Itertools;
use tracing::{info, instrument};

/// Concatenate every source's records and keep one record per title.
///
/// Within a title group the record with the latest `published` wins; equal
/// timestamps keep whichever was seen first (the sort is stable). The output
/// is ordered by title.
#[instrument(level = "info", skip_all, fields(sources = source_lists.len()))]
pub fn merge(source_lists: Vec<Vec<FeedRecord>>) -> Vec<FeedRecord> {
    let mut combined: Vec<FeedRecord> = source_lists.into_iter().flatten().collect();
    let total = combined.len();

    combined.sort_by(|a, b| {
        a.title
            .cmp(&b.title)
            .then_with(|| b.published.cmp(&a.published))
    });

    let merged: Vec<FeedRecord> = combined
        .into_iter()
        .unique_by(|r| r.title.clone())
        .collect();

    info!(
        total,
        kept = merged.len(),
        dropped = total - merged.len(),
        "Merged feed entries"
    );
    merged
}
