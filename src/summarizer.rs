//! Summarization stage.
//!
//! Each scraped article is sent to the completion service with the rendered
//! system prompt. Articles that overrun the model's length budget (or time
//! out) are skipped; any other failure ends the run.

use crate::api::{CompletionRequest, StructuredCompletion};
use crate::config::LlmConfig;
use crate::error::DigestError;
use crate::models::{ScrapedRecord, SummarizedRecord};
use tracing::{info, instrument, warn};

/// Substitute the target language into the prompt template.
pub fn render_prompt(template: &str, language: &str) -> String {
    template.replace("{language}", language)
}

/// Summarize every record, sequentially, in input order.
///
/// # Returns
///
/// One [`SummarizedRecord`] per input that did not hit the length limit.
///
/// # Errors
///
/// Any completion error other than `LengthExceeded` or `Timeout`.
#[instrument(level = "info", skip_all, fields(records = records.len(), model = %config.model))]
pub async fn summarize<C: StructuredCompletion>(
    completion: &C,
    records: Vec<ScrapedRecord>,
    config: &LlmConfig,
) -> Result<Vec<SummarizedRecord>, DigestError> {
    let system = render_prompt(&config.prompt, &config.language);
    let total = records.len();
    let mut summarized = Vec::with_capacity(total);

    for scraped in records {
        let request = CompletionRequest {
            model: &config.model,
            temperature: config.temperature,
            system: &system,
            user: &scraped.content,
        };
        match completion.summarize_text(&request).await {
            Ok(summary) => summarized.push(SummarizedRecord { scraped, summary }),
            Err(e @ (DigestError::LengthExceeded(_) | DigestError::Timeout(_))) => {
                warn!(title = %scraped.feed.title, error = %e, "Summarization skipped");
            }
            Err(e) => return Err(e),
        }
    }

    info!(total, summarized = summarized.len(), "Summarized articles");
    Ok(summarized)
}
