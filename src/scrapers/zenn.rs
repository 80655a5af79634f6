//! Zenn article scraper.
//!
//! Zenn has no markdown endpoint, so tags, body and author are read from the
//! rendered page. The class names are the hashed CSS-module names Zenn ships.

use super::{ArticleContent, og_image};
use crate::error::DigestError;
use crate::http::PageFetcher;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, instrument};

pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

static TAGS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.View_topics__2sHkl a.View_topicLink__jdtX_").unwrap());
static CONTENT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.znc.BodyContent_anchorToHeadings__uGxNv").unwrap());
static AUTHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.ProfileCard_displayName__gRUeY").unwrap());

/// Collect an element's text nodes, trimmed, skipping blanks.
fn text_of(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Extract article fields from a rendered Zenn page.
pub fn parse_page(html: &str) -> ArticleContent {
    let document = Html::parse_document(html);

    let tags = document
        .select(&TAGS)
        .map(|a| text_of(a, " "))
        .filter(|t| !t.is_empty())
        .collect();
    let content = document
        .select(&CONTENT)
        .next()
        .map(|el| text_of(el, "\n"))
        .unwrap_or_default();
    let author = document
        .select(&AUTHOR)
        .next()
        .map(|el| text_of(el, " "))
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    ArticleContent {
        tags,
        image_url: og_image(&document),
        content,
        author,
    }
}

/// Fetch and extract one Zenn article.
#[instrument(level = "info", skip(fetcher))]
pub async fn extract<F: PageFetcher>(fetcher: &F, link: &str) -> Result<ArticleContent, DigestError> {
    let html = fetcher.get_text(link).await?;
    let article = parse_page(&html);
    info!(bytes = article.content.len(), tags = article.tags.len(), "Parsed Zenn article");
    Ok(article)
}
