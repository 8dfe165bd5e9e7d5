//! Command-line interface definitions for the market news worker.
//!
//! Every option can also be supplied through the environment variable named
//! in its help text.

use crate::api::OPENAI_API_URL;
use crate::schedule::parse_time;
use chrono::NaiveTime;
use clap::Parser;

/// Command-line arguments for the market news worker.
///
/// # Examples
///
/// ```sh
/// # Stay resident and publish every day at 06:00 local time
/// market_news_worker --store-dir ./data
///
/// # One cycle with the offline writer, then exit
/// market_news_worker --run-once --offline-writer
///
/// # Custom sources and a different schedule
/// market_news_worker -c ./worker.yaml --schedule-at 07:30
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Run a single generation cycle and exit
    #[arg(long, env = "RUN_ONCE")]
    pub run_once: bool,

    /// Run a single cycle against an in-memory store and print the articles
    #[arg(long)]
    pub dry_run: bool,

    /// Optional path to a worker YAML config file
    #[arg(short, long, env = "WORKER_CONFIG")]
    pub config: Option<String>,

    /// Headlines per source to enrich and publish (overrides the config file)
    #[arg(short, long, env = "NEWS_LIMIT")]
    pub limit: Option<usize>,

    /// Root directory of the JSON document store
    #[arg(short, long, env = "STORE_DIR", default_value = "./data")]
    pub store_dir: String,

    /// Collection that articles are published to
    #[arg(long, env = "ARTICLE_COLLECTION", default_value = "articles")]
    pub collection: String,

    /// Local time of day (HH:MM) for the daily run
    #[arg(long, env = "SCHEDULE_AT", default_value = "06:00", value_parser = parse_time)]
    pub schedule_at: NaiveTime,

    /// API key for the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_API_BASE", default_value = OPENAI_API_URL)]
    pub openai_base_url: String,

    /// Chat model used for article bodies
    #[arg(long, env = "ARTICLE_MODEL", default_value = "gpt-4")]
    pub article_model: String,

    /// Chat model used for tag suggestions
    #[arg(long, env = "TAG_MODEL", default_value = "gpt-3.5-turbo")]
    pub tag_model: String,

    /// Retries per API call before falling back to the offline writer
    #[arg(long, env = "API_MAX_RETRIES", default_value_t = 5)]
    pub api_max_retries: usize,

    /// Use the offline templated writer instead of the API
    #[arg(long, env = "USE_MOCK_AI")]
    pub offline_writer: bool,

    /// Generate article images through the API instead of placeholders
    #[arg(long, env = "USE_AI_IMAGES")]
    pub ai_images: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    /// Whether article text should come from the API.
    pub fn uses_api_writer(&self) -> bool {
        !self.offline_writer && self.api_key().is_some()
    }

    /// The configured API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["market_news_worker"]);

        assert!(!cli.run_once);
        assert!(!cli.dry_run);
        assert_eq!(cli.store_dir, "./data");
        assert_eq!(cli.collection, "articles");
        assert_eq!(cli.schedule_at, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        assert_eq!(cli.article_model, "gpt-4");
        assert_eq!(cli.limit, None);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "market_news_worker",
            "--run-once",
            "-c",
            "/etc/worker.yaml",
            "-l",
            "3",
            "--schedule-at",
            "07:30",
            "--offline-writer",
            "--openai-api-key",
            "sk-test",
        ]);

        assert!(cli.run_once);
        assert_eq!(cli.config.as_deref(), Some("/etc/worker.yaml"));
        assert_eq!(cli.limit, Some(3));
        assert_eq!(cli.schedule_at, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert!(!cli.uses_api_writer());
    }

    #[test]
    fn test_api_writer_needs_a_key() {
        let cli = Cli::parse_from(["market_news_worker", "--openai-api-key", "  "]);
        assert_eq!(cli.api_key(), None);

        let cli = Cli::parse_from(["market_news_worker", "--openai-api-key", "sk-test"]);
        assert!(cli.uses_api_writer());
    }

    #[test]
    fn test_rejects_bad_schedule() {
        assert!(Cli::try_parse_from(["market_news_worker", "--schedule-at", "6am"]).is_err());
    }
}
