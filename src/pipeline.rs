//! End-to-end digest run.
//!
//! 1. **Fetch**: every Qiita and Zenn feed, filtered to the lookback window
//! 2. **Merge**: one record per title, latest wins
//! 3. **Scrape**: tags, author, body and image per article
//! 4. **Summarize**: structured completion per article
//! 5. **Notify**: one webhook message per article
//!
//! Stages run strictly one after another. An empty merge ends the run early
//! without touching the scraper, the LLM or the webhook.

use crate::api::StructuredCompletion;
use crate::config::AppConfig;
use crate::error::DigestError;
use crate::feeds;
use crate::http::PageFetcher;
use crate::merge::merge;
use crate::models::Source;
use crate::notifier::{WebhookSink, notify};
use crate::scrapers::scrape;
use crate::summarizer::summarize;
use chrono::DateTime;
use chrono_tz::Tz;
use std::time::Instant;
use tracing::{info, instrument};

/// Per-stage counts of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub fetched: usize,
    pub merged: usize,
    pub scraped: usize,
    pub summarized: usize,
    pub delivered: usize,
}

/// The configured pipeline and its network collaborators.
pub struct Pipeline<'a, F, C, S> {
    pub config: &'a AppConfig,
    pub fetcher: &'a F,
    pub completion: &'a C,
    pub sink: &'a S,
}

impl<'a, F, C, S> Pipeline<'a, F, C, S>
where
    F: PageFetcher,
    C: StructuredCompletion,
    S: WebhookSink,
{
    /// Execute one digest run.
    ///
    /// # Arguments
    ///
    /// * `now` - The run's reference instant; all lookback comparisons use it
    #[instrument(level = "info", skip_all, fields(%now))]
    pub async fn run(&self, now: DateTime<Tz>) -> Result<RunReport, DigestError> {
        let t0 = Instant::now();
        let config = self.config;
        let mut report = RunReport::default();

        let qiita = feeds::fetch(
            self.fetcher,
            &config.qiita.feeds,
            Source::Qiita,
            config.lookback_hours,
            now,
        )
        .await;
        let zenn = feeds::fetch(
            self.fetcher,
            &config.zenn.feeds,
            Source::Zenn,
            config.lookback_hours,
            now,
        )
        .await;
        report.fetched = qiita.len() + zenn.len();

        let merged = merge(vec![qiita, zenn]);
        report.merged = merged.len();
        info!(total_entries = report.merged, "Total entries after merge");
        if merged.is_empty() {
            info!("No new entries found; nothing to do");
            return Ok(report);
        }

        info!("Scraping articles");
        let scraped = scrape(self.fetcher, merged, config.scraper.max_articles).await?;
        report.scraped = scraped.len();

        info!("Summarizing articles");
        let summarized = summarize(self.completion, scraped, &config.llm).await?;
        report.summarized = summarized.len();

        info!("Sending messages");
        report.delivered = notify(self.sink, &summarized, &config.notifier).await?;

        let elapsed = t0.elapsed();
        info!(
            ?report,
            secs = elapsed.as_secs(),
            millis = elapsed.subsec_millis(),
            "Digest run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StubFetcher;
    use crate::notifier::testing::RecordingSink;
    use crate::summarizer::testing::StubCompletion;
    use chrono::{Duration, TimeZone};
    use chrono_tz::Asia::Tokyo;

    fn now() -> DateTime<Tz> {
        Tokyo.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap()
    }

    fn quoted(urls: &[&str]) -> String {
        urls.iter()
            .map(|u| format!("\"{u}\""))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn config(qiita_feeds: &[&str], zenn_feeds: &[&str]) -> AppConfig {
        let yaml = format!(
            r#"
lookback_hours: 24
qiita:
  feeds: [{}]
zenn:
  feeds: [{}]
llm:
  model: gpt-4o-mini
  language: Japanese
  prompt: "Summarize in {{language}}."
notifier:
  webhook_url: https://discord.com/api/webhooks/1/x
"#,
            quoted(qiita_feeds),
            quoted(zenn_feeds)
        );
        AppConfig::from_yaml(&yaml).unwrap()
    }

    #[tokio::test]
    async fn test_empty_feeds_end_run_without_downstream_calls() {
        let config = config(&[], &[]);
        let fetcher = StubFetcher::new();
        let completion = StubCompletion::default();
        let sink = RecordingSink::default();

        let pipeline = Pipeline {
            config: &config,
            fetcher: &fetcher,
            completion: &completion,
            sink: &sink,
        };
        let report = pipeline.run(now()).await.unwrap();

        assert_eq!(report, RunReport::default());
        assert!(fetcher.requested.borrow().is_empty());
        assert!(completion.systems.borrow().is_empty());
        assert!(sink.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_title_and_link_survive_every_stage() {
        let published = (now() - Duration::hours(2)).to_rfc2822();
        let older = (now() - Duration::hours(5)).to_rfc3339();
        let zenn_feed = format!(
            r#"<rss version="2.0"><channel>
<item><title>Shared Title</title><link>https://zenn.dev/a/shared</link><pubDate>{published}</pubDate></item>
</channel></rss>"#
        );
        let qiita_feed = format!(
            r#"<feed xmlns="http://www.w3.org/2005/Atom">
<entry><title>Shared Title</title><link rel="alternate" href="https://qiita.com/u/items/shared"/><published>{older}</published></entry>
<entry><title>Qiita Only</title><link rel="alternate" href="https://qiita.com/u/items/only"/><published>{older}</published></entry>
</feed>"#
        );
        let zenn_page = r#"<html><head><meta property="og:image" content="https://img/z.png"></head><body>
<div class="View_topics__2sHkl"><a class="View_topicLink__jdtX_">Rust</a></div>
<div class="znc BodyContent_anchorToHeadings__uGxNv"><p>zenn body</p></div>
<a class="ProfileCard_displayName__gRUeY">Ferris</a></body></html>"#;

        let fetcher = StubFetcher::new()
            .page("https://qiita.com/feed", &qiita_feed)
            .page("https://zenn.dev/feed", &zenn_feed)
            .page(
                "https://qiita.com/u/items/only.md",
                "---\ntags: Rust\nauthor: alice\n---\nqiita body",
            )
            .page("https://qiita.com/u/items/only", "<html></html>")
            .page("https://zenn.dev/a/shared", zenn_page);
        let config = config(&["https://qiita.com/feed"], &["https://zenn.dev/feed"]);
        let completion = StubCompletion::default();
        let sink = RecordingSink::default();

        let pipeline = Pipeline {
            config: &config,
            fetcher: &fetcher,
            completion: &completion,
            sink: &sink,
        };
        let report = pipeline.run(now()).await.unwrap();

        assert_eq!(
            report,
            RunReport {
                fetched: 3,
                merged: 2,
                scraped: 2,
                summarized: 2,
                delivered: 2,
            }
        );

        let sent = sink.sent.borrow();
        let delivered: Vec<(&str, &str)> = sent
            .iter()
            .map(|p| (p.embeds[0].title.as_str(), p.embeds[0].url.as_str()))
            .collect();
        assert_eq!(
            delivered,
            vec![
                ("Qiita Only", "https://qiita.com/u/items/only"),
                ("Shared Title", "https://zenn.dev/a/shared"),
            ]
        );
        assert_eq!(sent[1].embeds[0].description, "summary of zenn body");
        assert_eq!(sent[1].embeds[0].author.name, "Ferris");
    }

    #[tokio::test]
    async fn test_fatal_summarizer_error_stops_before_notifying() {
        let published = (now() - Duration::hours(1)).to_rfc2822();
        let zenn_feed = format!(
            r#"<rss version="2.0"><channel>
<item><title>Boom</title><link>https://zenn.dev/a/boom</link><pubDate>{published}</pubDate></item>
</channel></rss>"#
        );
        let fetcher = StubFetcher::new()
            .page("https://zenn.dev/feed", &zenn_feed)
            .page(
                "https://zenn.dev/a/boom",
                r#"<div class="znc BodyContent_anchorToHeadings__uGxNv">explode</div>"#,
            );
        let config = config(&[], &["https://zenn.dev/feed"]);
        let completion = StubCompletion {
            fatal: vec!["explode".into()],
            ..Default::default()
        };
        let sink = RecordingSink::default();

        let pipeline = Pipeline {
            config: &config,
            fetcher: &fetcher,
            completion: &completion,
            sink: &sink,
        };
        assert!(pipeline.run(now()).await.is_err());
        assert!(sink.sent.borrow().is_empty());
    }
}
