//! HTTP GET plumbing shared by the feed fetcher and the scrapers.
//!
//! [`PageFetcher`] is the seam the stages are written against; [`HttpClient`]
//! is the production implementation on top of a single `reqwest::Client`.

use crate::error::DigestError;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Some article hosts refuse requests without a browser-looking agent.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36";

/// Fetch a URL and return its body as text.
///
/// Implementations must report non-2xx responses as
/// [`DigestError::HttpStatus`] and timeouts as [`DigestError::Timeout`] so
/// callers can tell per-item failures apart from fatal ones.
pub trait PageFetcher {
    async fn get_text(&self, url: &str) -> Result<String, DigestError>;
}

/// `reqwest`-backed [`PageFetcher`] with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, DigestError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// The underlying client, shared with the API and webhook wrappers.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Map a transport error, turning timeouts into the recoverable variant.
pub fn classify_transport_error(url: &str, e: reqwest::Error) -> DigestError {
    if e.is_timeout() {
        DigestError::Timeout(url.to_string())
    } else {
        DigestError::Http(e)
    }
}

impl PageFetcher for HttpClient {
    #[instrument(level = "debug", skip(self))]
    async fn get_text(&self, url: &str) -> Result<String, DigestError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "Non-success HTTP status");
            return Err(DigestError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| classify_transport_error(url, e))?;
        debug!(
            %url,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}
