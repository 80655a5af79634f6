//! Qiita article scraper.
//!
//! Qiita serves every article as raw markdown at `{link}.md`, prefixed with a
//! YAML front-matter block:
//!
//! ```text
//! ---
//! title: ...
//! tags: Rust tokio
//! author: alice
//! ---
//! body...
//! ```
//!
//! The preview image is not part of the markdown, so the rendered page is
//! fetched as well for its `og:image`.

use super::{ArticleContent, og_image};
use crate::error::DigestError;
use crate::http::PageFetcher;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use serde_yaml::Value;
use tracing::{info, instrument};

static FRONT_MATTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A\s*---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n(.*))?\z").unwrap()
});

#[derive(Debug, Deserialize)]
struct FrontMatter {
    tags: Option<Value>,
    author: Option<Value>,
}

/// Markdown endpoint for an article link.
pub fn markdown_url(link: &str) -> String {
    format!("{}.md", link.trim_end_matches('/'))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Split a markdown document into `(tags, author, body)`.
pub fn parse_front_matter(markdown: &str) -> Result<(Vec<String>, String, String), DigestError> {
    let caps = FRONT_MATTER
        .captures(markdown)
        .ok_or_else(|| DigestError::FrontMatter("no front matter block".to_string()))?;
    let header = caps.get(1).map_or("", |m| m.as_str());
    let body = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();

    let meta: FrontMatter = serde_yaml::from_str(header)
        .map_err(|e| DigestError::FrontMatter(format!("invalid YAML: {e}")))?;

    let tags = match meta.tags {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar).collect(),
        Some(ref value) => scalar(value)
            .ok_or_else(|| DigestError::FrontMatter("tags is not a string".to_string()))?
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        None => return Err(DigestError::FrontMatter("missing tags".to_string())),
    };
    let author = meta
        .author
        .as_ref()
        .and_then(scalar)
        .ok_or_else(|| DigestError::FrontMatter("missing author".to_string()))?;

    Ok((tags, author, body))
}

/// Fetch and extract one Qiita article.
#[instrument(level = "info", skip(fetcher))]
pub async fn extract<F: PageFetcher>(fetcher: &F, link: &str) -> Result<ArticleContent, DigestError> {
    let markdown = fetcher.get_text(&markdown_url(link)).await?;
    let (tags, author, content) = parse_front_matter(&markdown)?;

    let html = fetcher.get_text(link).await?;
    let image_url = og_image(&Html::parse_document(&html));

    info!(bytes = content.len(), tags = tags.len(), "Parsed Qiita article");
    Ok(ArticleContent {
        tags,
        image_url,
        content,
        author,
    })
}
