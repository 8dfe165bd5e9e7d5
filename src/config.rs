//! Worker configuration: news sources, symbol rules and the stock catalogue.
//!
//! Every field has a built-in default, so the YAML file is optional and only
//! needs to list what it overrides:
//!
//! ```yaml
//! limit_per_source: 3
//! sources:
//!   - name: CNBC
//!     url: https://www.cnbc.com/markets/
//!     selector: .Card-title a
//!     baseUrl: https://www.cnbc.com
//! ```

use crate::error::ConfigError;
use crate::models::{NewsSourceConfig, SymbolRule};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument};
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Listing pages, scraped in this order.
    pub sources: Vec<NewsSourceConfig>,
    /// Symbol rules, evaluated in this order.
    pub symbols: Vec<SymbolRule>,
    /// Display names keyed by ticker, used for stock keywords on articles.
    pub stocks: BTreeMap<String, String>,
    pub limit_per_source: usize,
    pub author: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            symbols: default_symbol_rules(),
            stocks: default_stock_names(),
            limit_per_source: 5,
            author: "AI Financial Analyst".to_string(),
            request_timeout_secs: 30,
            user_agent: concat!("market_news_worker/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl WorkerConfig {
    /// Load the configuration from `path`, or the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(Path::new(path)).map_err(|source| {
                    ConfigError::Read {
                        path: path.to_string(),
                        source,
                    }
                })?;
                let config: WorkerConfig = serde_yaml::from_str(&raw)?;
                info!(path, "Loaded configuration file");
                config
            }
            None => {
                info!("No configuration file given; using built-in sources");
                WorkerConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Invalid("no news sources configured".into()));
        }
        if self.limit_per_source == 0 {
            return Err(ConfigError::Invalid("limit_per_source must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be positive".into()));
        }
        for source in &self.sources {
            if Url::parse(&source.url).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "source {} has an invalid url {:?}",
                    source.name, source.url
                )));
            }
            if !source.base_url.is_empty() && Url::parse(&source.base_url).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "source {} has an invalid base url {:?}",
                    source.name, source.base_url
                )));
            }
            if let Err(e) = Selector::parse(&source.selector) {
                return Err(ConfigError::Invalid(format!(
                    "source {} has an invalid selector {:?}: {e:?}",
                    source.name, source.selector
                )));
            }
        }
        if let Some(rule) = self.symbols.iter().find(|r| r.symbol.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "symbol rule with keywords {:?} has no symbol",
                rule.keywords
            )));
        }
        Ok(())
    }
}

pub fn default_sources() -> Vec<NewsSourceConfig> {
    vec![
        NewsSourceConfig {
            name: "Financial Times".to_string(),
            url: "https://www.ft.com/markets".to_string(),
            selector: ".o-teaser__heading a".to_string(),
            base_url: "https://www.ft.com".to_string(),
        },
        NewsSourceConfig {
            name: "Bloomberg".to_string(),
            url: "https://www.bloomberg.com/markets".to_string(),
            selector: ".story-package-module__story__headline-link".to_string(),
            base_url: "https://www.bloomberg.com".to_string(),
        },
        NewsSourceConfig {
            name: "CNBC".to_string(),
            url: "https://www.cnbc.com/markets/".to_string(),
            selector: ".Card-title a".to_string(),
            base_url: "https://www.cnbc.com".to_string(),
        },
    ]
}

pub fn default_symbol_rules() -> Vec<SymbolRule> {
    vec![
        SymbolRule::new("AAPL", &["Apple", "iPhone", "iPad", "Tim Cook"]),
        SymbolRule::new("MSFT", &["Microsoft", "Windows", "Azure", "Satya Nadella"]),
        SymbolRule::new("GOOGL", &["Google", "Alphabet", "Android", "Sundar Pichai"]),
        SymbolRule::new("AMZN", &["Amazon", "AWS", "Jeff Bezos", "Andy Jassy"]),
        SymbolRule::new("META", &["Meta", "Facebook", "Instagram", "Mark Zuckerberg"]),
        SymbolRule::new("TSLA", &["Tesla", "Elon Musk", "Electric Vehicle", "EV"]),
        SymbolRule::new("NVDA", &["Nvidia", "GPU", "Jensen Huang"]),
    ]
}

pub fn default_stock_names() -> BTreeMap<String, String> {
    [
        ("AAPL", "Apple Inc."),
        ("MSFT", "Microsoft Corporation"),
        ("GOOGL", "Alphabet Inc."),
        ("AMZN", "Amazon.com, Inc."),
        ("META", "Meta Platforms, Inc."),
        ("TSLA", "Tesla, Inc."),
        ("NVDA", "NVIDIA Corporation"),
        ("JPM", "JPMorgan Chase & Co."),
        ("V", "Visa Inc."),
        ("WMT", "Walmart Inc."),
    ]
    .into_iter()
    .map(|(symbol, name)| (symbol.to_string(), name.to_string()))
    .collect()
}
