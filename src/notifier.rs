//! Webhook notifications.
//!
//! Every summarized article becomes one Discord embed: the title links to the
//! article, the summary is the description, and the author and tags are
//! shown alongside the optional preview image.

use crate::config::NotifierConfig;
use crate::error::DigestError;
use crate::models::SummarizedRecord;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

/// Embed accent colour.
pub const EMBED_COLOR: u32 = 0x009999;

// Discord rejects the whole message when an embed field exceeds its limit.
const TITLE_LIMIT: usize = 256;
const DESCRIPTION_LIMIT: usize = 4096;
const FIELD_VALUE_LIMIT: usize = 1024;
const AUTHOR_NAME_LIMIT: usize = 256;

/// Cut `s` to at most `max` characters, ending in `…` when shortened.
fn clamp_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embed {
    pub title: String,
    pub url: String,
    pub description: String,
    pub color: u32,
    pub author: EmbedAuthor,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
}

impl WebhookPayload {
    /// Build the message for one article.
    pub fn for_record(record: &SummarizedRecord) -> Self {
        let scraped = &record.scraped;
        let tags = if scraped.tags.is_empty() {
            "-".to_string()
        } else {
            scraped.tags.join(", ")
        };
        let image = scraped
            .image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| EmbedImage {
                url: url.to_string(),
            });

        Self {
            embeds: vec![Embed {
                title: clamp_chars(record.title(), TITLE_LIMIT),
                url: record.link().to_string(),
                description: clamp_chars(&record.summary, DESCRIPTION_LIMIT),
                color: EMBED_COLOR,
                author: EmbedAuthor {
                    name: clamp_chars(&scraped.author, AUTHOR_NAME_LIMIT),
                },
                fields: vec![EmbedField {
                    name: "Tags".to_string(),
                    value: clamp_chars(&tags, FIELD_VALUE_LIMIT),
                    inline: false,
                }],
                image,
            }],
        }
    }
}

/// Destination for formatted messages.
pub trait WebhookSink {
    async fn deliver(&self, payload: &WebhookPayload) -> Result<(), DigestError>;
}

/// Discord webhook over `reqwest`.
#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    client: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }
}

impl WebhookSink for DiscordWebhook {
    #[instrument(level = "debug", skip_all)]
    async fn deliver(&self, payload: &WebhookPayload) -> Result<(), DigestError> {
        let resp = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| DigestError::Delivery(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(DigestError::Delivery(format!(
            "HTTP {}: {}",
            status.as_u16(),
            crate::utils::truncate_for_log(&body, 200)
        )))
    }
}

/// Post one message per record, in order.
///
/// # Returns
///
/// The number of messages delivered.
///
/// # Errors
///
/// Only when `abort_on_failure` is set: the first delivery failure.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub async fn notify<S: WebhookSink>(
    sink: &S,
    records: &[SummarizedRecord],
    config: &NotifierConfig,
) -> Result<usize, DigestError> {
    let mut delivered = 0usize;

    for record in records {
        let payload = WebhookPayload::for_record(record);
        match sink.deliver(&payload).await {
            Ok(()) => {
                delivered += 1;
                info!(title = %record.title(), "Posted summary");
            }
            Err(e) if config.abort_on_failure => {
                error!(title = %record.title(), error = %e, "Delivery failed; aborting batch");
                return Err(e);
            }
            Err(e) => {
                error!(title = %record.title(), error = %e, "Delivery failed; skipping message");
            }
        }
    }

    info!(delivered, failed = records.len() - delivered, "Notifications sent");
    Ok(delivered)
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;
    use crate::models::{FeedRecord, ScrapedRecord, Source};
    use chrono::TimeZone;
    use chrono_tz::Asia::Tokyo;

    fn record(title: &str, tags: &[&str], image_url: Option<&str>) -> SummarizedRecord {
        SummarizedRecord {
            scraped: ScrapedRecord {
                feed: FeedRecord {
                    title: title.into(),
                    link: format!("https://qiita.com/u/items/{title}"),
                    published: Tokyo.with_ymd_and_hms(2025, 5, 6, 9, 0, 0).unwrap(),
                    source: Source::Qiita,
                },
                tags: tags.iter().map(|t| t.to_string()).collect(),
                image_url: image_url.map(str::to_string),
                content: "body".into(),
                author: "alice".into(),
            },
            summary: format!("summary of {title}"),
        }
    }

    fn config(abort_on_failure: bool) -> NotifierConfig {
        NotifierConfig {
            webhook_url: "https://discord.com/api/webhooks/1/x".into(),
            abort_on_failure,
        }
    }

    #[test]
    fn test_payload_fields() {
        let payload = WebhookPayload::for_record(&record("t", &["Rust", "tokio"], Some("https://img/x.png")));
        let embed = &payload.embeds[0];
        assert_eq!(embed.title, "t");
        assert_eq!(embed.url, "https://qiita.com/u/items/t");
        assert_eq!(embed.description, "summary of t");
        assert_eq!(embed.author.name, "alice");
        assert_eq!(embed.fields[0].name, "Tags");
        assert_eq!(embed.fields[0].value, "Rust, tokio");
        assert_eq!(embed.color, 0x009999);
        assert_eq!(embed.image.as_ref().unwrap().url, "https://img/x.png");
    }

    #[test]
    fn test_payload_omits_missing_or_blank_image() {
        let none = WebhookPayload::for_record(&record("t", &[], None));
        assert_eq!(none.embeds[0].image, None);
        assert_eq!(none.embeds[0].fields[0].value, "-");

        let blank = WebhookPayload::for_record(&record("t", &["a"], Some("  ")));
        assert_eq!(blank.embeds[0].image, None);

        let json = serde_json::to_value(&none).unwrap();
        assert!(json["embeds"][0].get("image").is_none());
        assert_eq!(json["embeds"][0]["author"]["name"], "alice");
    }

    #[test]
    fn test_payload_fields_are_clamped_to_discord_limits() {
        let mut long = record("t", &[], None);
        long.scraped.feed.title = "タ".repeat(300);
        long.summary = "要".repeat(5000);
        long.scraped.tags = (0..400).map(|i| format!("tag{i}")).collect();

        let embed = &WebhookPayload::for_record(&long).embeds[0];
        assert_eq!(embed.title.chars().count(), 256);
        assert!(embed.title.ends_with('…'));
        assert_eq!(embed.description.chars().count(), 4096);
        assert!(embed.description.ends_with('…'));
        assert_eq!(embed.fields[0].value.chars().count(), 1024);
        assert!(embed.fields[0].value.starts_with("tag0, tag1"));

        let short = WebhookPayload::for_record(&record("t", &["Rust"], None));
        assert_eq!(short.embeds[0].description, "summary of t");
    }

    #[tokio::test]
    async fn test_delivery_failure_is_isolated_by_default() {
        let sink = RecordingSink {
            failing: vec!["b".into()],
            ..Default::default()
        };
        let records = vec![record("a", &[], None), record("b", &[], None), record("c", &[], None)];

        let delivered = notify(&sink, &records, &config(false)).await.unwrap();
        assert_eq!(delivered, 2);
        let titles: Vec<String> = sink.sent.borrow().iter().map(|p| p.embeds[0].title.clone()).collect();
        assert_eq!(titles, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_abort_on_failure_stops_the_batch() {
        let sink = RecordingSink {
            failing: vec!["b".into()],
            ..Default::default()
        };
        let records = vec![record("a", &[], None), record("b", &[], None), record("c", &[], None)];

        let err = notify(&sink, &records, &config(true)).await.unwrap_err();
        assert!(matches!(err, DigestError::Delivery(_)));
        assert_eq!(sink.sent.borrow().len(), 1);
    }
}
