//! Run configuration loaded once from `config.yaml`.
//!
//! The file is flat YAML; see `config.example.yaml` at the repository root.
//! Secrets are not read from the file: the LLM API key arrives through the
//! CLI / environment (see [`crate::cli::Cli`]).

use crate::error::DigestError;
use chrono::{TimeDelta, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Entries older than this many hours before the run start are ignored.
    pub lookback_hours: i64,
    /// IANA name of the zone every timestamp is normalized to.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub qiita: FeedSourceConfig,
    #[serde(default)]
    pub zenn: FeedSourceConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub llm: LlmConfig,
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedSourceConfig {
    #[serde(default)]
    pub feeds: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Stop after this many articles were scraped; `null` disables the cap.
    #[serde(default = "default_max_articles")]
    pub max_articles: Option<usize>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            max_articles: default_max_articles(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    /// Substituted for `{language}` in the prompt.
    pub language: String,
    #[serde(default)]
    pub temperature: f32,
    /// System prompt template.
    pub prompt: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    pub webhook_url: String,
    /// Abort the batch on the first failed delivery instead of skipping it.
    #[serde(default)]
    pub abort_on_failure: bool,
}

fn default_timezone() -> String {
    "Asia/Tokyo".to_string()
}

fn default_max_articles() -> Option<usize> {
    Some(5)
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

impl AppConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, DigestError> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the config file at `path`.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, DigestError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        let config = Self::from_yaml(&raw)?;
        info!(
            lookback_hours = config.lookback_hours,
            timezone = %config.timezone,
            qiita_feeds = config.qiita.feeds.len(),
            zenn_feeds = config.zenn.feeds.len(),
            model = %config.llm.model,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// The configured reference timezone.
    pub fn tz(&self) -> Result<Tz, DigestError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| DigestError::Config(format!("timezone {:?}: {e}", self.timezone)))
    }

    fn validate(&self) -> Result<(), DigestError> {
        if self.lookback_hours <= 0 {
            return Err(DigestError::Config(
                "lookback_hours must be positive".to_string(),
            ));
        }
        TimeDelta::try_hours(self.lookback_hours)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .ok_or_else(|| {
                DigestError::Config(format!(
                    "lookback_hours {} is out of range",
                    self.lookback_hours
                ))
            })?;
        self.tz()?;
        if self.http.timeout_secs == 0 {
            return Err(DigestError::Config(
                "http.timeout_secs must be positive".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(DigestError::Config(format!(
                "llm.temperature {} is outside 0..=2",
                self.llm.temperature
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(DigestError::Config("llm.model is empty".to_string()));
        }
        if self.notifier.webhook_url.trim().is_empty() {
            return Err(DigestError::Config(
                "notifier.webhook_url is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
lookback_hours: 24
llm:
  model: gpt-4o-mini
  language: Japanese
  prompt: "Summarize in {language}."
notifier:
  webhook_url: https://discord.com/api/webhooks/1/abc
"#;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.lookback_hours, 24);
        assert_eq!(config.timezone, "Asia/Tokyo");
        assert!(config.qiita.feeds.is_empty());
        assert!(config.zenn.feeds.is_empty());
        assert_eq!(config.scraper.max_articles, Some(5));
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.llm.temperature, 0.0);
        assert!(!config.notifier.abort_on_failure);
        assert_eq!(config.tz().unwrap(), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
lookback_hours: 12
timezone: GMT
qiita:
  feeds: ["https://qiita.com/popular-items/feed"]
zenn:
  feeds: ["https://zenn.dev/feed", "https://zenn.dev/topics/rust/feed"]
scraper:
  max_articles: null
http:
  timeout_secs: 5
llm:
  model: gpt-4o
  language: English
  temperature: 0.3
  prompt: "Summarize in {language}."
  base_url: http://localhost:8080/v1
notifier:
  webhook_url: https://discord.com/api/webhooks/1/abc
  abort_on_failure: true
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.zenn.feeds.len(), 2);
        assert_eq!(config.scraper.max_articles, None);
        assert_eq!(config.http.timeout_secs, 5);
        assert_eq!(config.tz().unwrap(), chrono_tz::GMT);
        assert!(config.notifier.abort_on_failure);
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        let yaml = MINIMAL.replace("lookback_hours: 24", "lookback_hours: 24\ntimezone: Mars/Olympus");
        let err = AppConfig::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, DigestError::Config(_)));
    }

    #[test]
    fn test_rejects_non_positive_lookback() {
        let yaml = MINIMAL.replace("lookback_hours: 24", "lookback_hours: 0");
        assert!(matches!(
            AppConfig::from_yaml(&yaml).unwrap_err(),
            DigestError::Config(_)
        ));
    }

    #[test]
    fn test_rejects_lookback_beyond_date_range() {
        for hours in ["3000000000", "9223372036854775807"] {
            let yaml = MINIMAL.replace("lookback_hours: 24", &format!("lookback_hours: {hours}"));
            assert!(matches!(
                AppConfig::from_yaml(&yaml).unwrap_err(),
                DigestError::Config(_)
            ));
        }
        let year = MINIMAL.replace("lookback_hours: 24", "lookback_hours: 8760");
        assert_eq!(AppConfig::from_yaml(&year).unwrap().lookback_hours, 8760);
    }

    #[test]
    fn test_rejects_zero_http_timeout() {
        let yaml = format!("{MINIMAL}http:\n  timeout_secs: 0\n");
        assert!(matches!(
            AppConfig::from_yaml(&yaml).unwrap_err(),
            DigestError::Config(_)
        ));
    }

    #[test]
    fn test_rejects_empty_webhook() {
        let yaml = MINIMAL.replace("https://discord.com/api/webhooks/1/abc", "\"\"");
        assert!(matches!(
            AppConfig::from_yaml(&yaml).unwrap_err(),
            DigestError::Config(_)
        ));
    }

    #[test]
    fn test_missing_llm_section_is_yaml_error() {
        let yaml = "lookback_hours: 24\nnotifier:\n  webhook_url: x\n";
        assert!(matches!(
            AppConfig::from_yaml(yaml).unwrap_err(),
            DigestError::Yaml(_)
        ));
    }
}
