//! # Tech Feeds Digest
//!
//! Collects fresh articles from Qiita and Zenn feeds, summarizes each one
//! through an OpenAI-compatible LLM and posts the summaries to a Discord
//! webhook.
//!
//! ## Usage
//!
//! ```sh
//! OPENAI_API_KEY=sk-... tech_feeds_digest --config config.yaml
//! ```
//!
//! ## Architecture
//!
//! The application is a one-shot sequential pipeline:
//! 1. **Fetching**: read every configured feed and keep entries inside the lookback window
//! 2. **Merging**: collapse duplicate titles to the most recent entry
//! 3. **Scraping**: extract tags, author, body and preview image per article
//! 4. **Summarizing**: ask the LLM for a structured summary of each body
//! 5. **Notifying**: post one embed per article to the webhook

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod feeds;
mod http;
mod merge;
mod models;
mod notifier;
mod pipeline;
mod scrapers;
mod summarizer;
mod utils;

use api::OpenAiClient;
use cli::Cli;
use config::AppConfig;
use http::HttpClient;
use notifier::DiscordWebhook;
use pipeline::Pipeline;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "tech_feeds_digest starting up");

    let args = Cli::parse();
    let config = match AppConfig::load(&args.config).await {
        Ok(config) => config,
        Err(e) => {
            error!(path = %args.config, error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    // One reference instant for every lookback comparison in this run.
    let tz = config.tz()?;
    let now = Utc::now().with_timezone(&tz);

    let http = HttpClient::new(Duration::from_secs(config.http.timeout_secs))?;
    let completion = OpenAiClient::new(
        http.client().clone(),
        &config.llm.base_url,
        args.openai_api_key.clone(),
    );
    let sink = DiscordWebhook::new(http.client().clone(), config.notifier.webhook_url.clone());

    let pipeline = Pipeline {
        config: &config,
        fetcher: &http,
        completion: &completion,
        sink: &sink,
    };

    match pipeline.run(now).await {
        Ok(report) => {
            info!(
                fetched = report.fetched,
                merged = report.merged,
                scraped = report.scraped,
                summarized = report.summarized,
                delivered = report.delivered,
                "tech_feeds_digest finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Digest run failed");
            Err(e.into())
        }
    }
}
