//! Article content scrapers.
//!
//! Each feed source has its own extraction strategy, selected by a closed
//! match on [`Source`]:
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Qiita | [`qiita`] | Raw markdown + front matter | `{link}.md` endpoint; image from the HTML page |
//! | Zenn | [`zenn`] | HTML scraping | Fixed CSS selectors; author falls back to `Unknown Author` |
//!
//! # Failure handling
//!
//! Invalid links, non-2xx responses, malformed front matter and timeouts
//! drop only the affected record. Anything else aborts the batch.

pub mod qiita;
pub mod zenn;

use crate::error::DigestError;
use crate::http::PageFetcher;
use crate::models::{FeedRecord, ScrapedRecord, Source};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, error, info, instrument};
use url::Url;

static OG_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());

/// Fields extracted from an article page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleContent {
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub content: String,
    pub author: String,
}

/// Extraction strategy for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    QiitaMarkdown,
    ZennHtml,
}

impl Extractor {
    pub fn for_source(source: Source) -> Self {
        match source {
            Source::Qiita => Extractor::QiitaMarkdown,
            Source::Zenn => Extractor::ZennHtml,
        }
    }

    pub async fn extract<F: PageFetcher>(
        &self,
        fetcher: &F,
        link: &str,
    ) -> Result<ArticleContent, DigestError> {
        match self {
            Extractor::QiitaMarkdown => qiita::extract(fetcher, link).await,
            Extractor::ZennHtml => zenn::extract(fetcher, link).await,
        }
    }
}

/// Read the Open-Graph preview image from a parsed page.
pub fn og_image(document: &Html) -> Option<String> {
    document
        .select(&OG_IMAGE)
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::trim)
        .find(|url| !url.is_empty())
        .map(str::to_string)
}

/// Reject records whose link cannot be scraped.
pub fn validate_link(record: &FeedRecord) -> Result<&str, DigestError> {
    let link = record.link.trim();
    if link.is_empty() {
        return Err(DigestError::InvalidFeedData(format!(
            "missing link for {} entry {:?}",
            record.source, record.title
        )));
    }
    match Url::parse(link) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(link),
        _ => Err(DigestError::InvalidFeedData(format!(
            "invalid link {link:?} for {} entry {:?}",
            record.source, record.title
        ))),
    }
}

#[instrument(level = "info", skip_all, fields(title = %record.title, source = %record.source))]
async fn scrape_one<F: PageFetcher>(
    fetcher: &F,
    record: &FeedRecord,
) -> Result<ArticleContent, DigestError> {
    let link = validate_link(record)?;
    let content = Extractor::for_source(record.source)
        .extract(fetcher, link)
        .await?;
    debug!(
        tags = content.tags.len(),
        bytes = content.content.len(),
        has_image = content.image_url.is_some(),
        "Scraped article"
    );
    Ok(content)
}

/// Scrape every record, sequentially, in input order.
///
/// # Arguments
///
/// * `fetcher` - HTTP collaborator
/// * `records` - Merged feed records
/// * `max_articles` - Stop once this many records were scraped (`None` = no cap)
///
/// # Returns
///
/// The successfully scraped records, input order preserved. Per-record
/// failures are logged and skipped; an unclassified error is returned.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub async fn scrape<F: PageFetcher>(
    fetcher: &F,
    records: Vec<FeedRecord>,
    max_articles: Option<usize>,
) -> Result<Vec<ScrapedRecord>, DigestError> {
    let mut scraped = Vec::new();

    for record in records {
        if max_articles.is_some_and(|max| scraped.len() >= max) {
            info!(max = ?max_articles, "Reached article limit; not scraping further");
            break;
        }
        match scrape_one(fetcher, &record).await {
            Ok(content) => scraped.push(ScrapedRecord {
                feed: record,
                tags: content.tags,
                image_url: content.image_url,
                content: content.content,
                author: content.author,
            }),
            Err(e) if e.is_recoverable() => {
                error!(title = %record.title, link = %record.link, error = %e, "Scrape failed; dropping record");
            }
            Err(e) => return Err(e),
        }
    }

    info!(count = scraped.len(), "Scraped article contents");
    Ok(scraped)
}
