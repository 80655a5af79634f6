//! Command-line interface definitions for the tech feeds digest.
//!
//! Everything except the config location and the API key lives in the YAML
//! config file. Both arguments can also come from the environment.

use clap::Parser;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Uses ./config.yaml and $OPENAI_API_KEY
/// tech_feeds_digest
///
/// # Explicit config path
/// tech_feeds_digest --config /etc/tech_feeds_digest/config.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, env = "DIGEST_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// API key for the OpenAI-compatible completion endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "tech_feeds_digest",
            "--config",
            "./digest.yaml",
            "--openai-api-key",
            "sk-test",
        ]);

        assert_eq!(cli.config, "./digest.yaml");
        assert_eq!(cli.openai_api_key, "sk-test");
    }

    #[test]
    fn test_cli_short_flag() {
        let cli = Cli::parse_from([
            "tech_feeds_digest",
            "-c",
            "/tmp/config.yaml",
            "--openai-api-key",
            "sk-test",
        ]);

        assert_eq!(cli.config, "/tmp/config.yaml");
    }
}
