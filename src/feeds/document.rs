//! Syndication document parsing (RSS 2.0 and Atom).
//!
//! Entries are returned raw: the timestamp stays a string because how it is
//! parsed depends on the source, not on the document format.

use crate::error::DigestError;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;

/// One feed entry before timestamp normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomDocument {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Rss,
    Atom,
}

/// Look at the first element to tell RSS from Atom.
fn sniff_format(xml: &str) -> Result<Format, DigestError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return match e.local_name().as_ref() {
                    b"rss" => Ok(Format::Rss),
                    b"feed" => Ok(Format::Atom),
                    other => Err(DigestError::InvalidFeedData(format!(
                        "unsupported feed root <{}>",
                        String::from_utf8_lossy(other)
                    ))),
                };
            }
            Ok(Event::Eof) => {
                return Err(DigestError::InvalidFeedData(
                    "empty feed document".to_string(),
                ));
            }
            Err(e) => {
                return Err(DigestError::InvalidFeedData(format!(
                    "malformed feed document: {e}"
                )));
            }
            _ => {}
        }
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Parse an RSS or Atom document into raw entries, in document order.
pub fn parse_document(xml: &str) -> Result<Vec<RawEntry>, DigestError> {
    match sniff_format(xml)? {
        Format::Rss => {
            let doc: RssDocument = from_str(xml)?;
            Ok(doc
                .channel
                .items
                .into_iter()
                .map(|item| RawEntry {
                    title: non_empty(item.title),
                    link: non_empty(item.link),
                    published: non_empty(item.pub_date),
                })
                .collect())
        }
        Format::Atom => {
            let doc: AtomDocument = from_str(xml)?;
            Ok(doc
                .entries
                .into_iter()
                .map(|entry| {
                    // rel defaults to "alternate" when absent
                    let link = entry
                        .links
                        .iter()
                        .find(|l| l.rel.as_deref().unwrap_or("alternate") == "alternate")
                        .or_else(|| entry.links.first())
                        .map(|l| l.href.clone());
                    RawEntry {
                        title: non_empty(entry.title),
                        link: non_empty(link),
                        published: non_empty(entry.published.or(entry.updated)),
                    }
                })
                .collect())
        }
    }
}
