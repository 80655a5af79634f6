//! Error taxonomy for the digest pipeline.
//!
//! Every stage returns [`DigestError`]. The per-item variants (see
//! [`DigestError::is_recoverable`]) are caught at the item boundary, logged
//! and the item is dropped; everything else propagates out of `main` and
//! terminates the run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    /// A feed entry carried a timestamp in an unexpected format.
    #[error("failed to parse timestamp {value:?}: {reason}")]
    Parse { value: String, reason: String },

    /// Unknown source tag or a record without a usable link.
    #[error("invalid feed data: {0}")]
    InvalidFeedData(String),

    /// Non-2xx response from a GET.
    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Markdown front matter missing or malformed.
    #[error("malformed front matter: {0}")]
    FrontMatter(String),

    /// Request exceeded the configured HTTP timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The summarization input or output overran the model's token budget.
    #[error("content exceeded the model length limit: {0}")]
    LengthExceeded(String),

    /// Webhook delivery failed.
    #[error("webhook delivery failed: {0}")]
    Delivery(String),

    /// The completion API answered with an error we don't classify.
    #[error("completion API error: {0}")]
    Completion(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::de::DeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DigestError {
    /// True for failures that only cost the current item.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DigestError::Parse { .. }
                | DigestError::InvalidFeedData(_)
                | DigestError::HttpStatus { .. }
                | DigestError::FrontMatter(_)
                | DigestError::Timeout(_)
                | DigestError::LengthExceeded(_)
                | DigestError::Delivery(_)
        )
    }
}
