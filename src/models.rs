//! Data models shared by the ingestion, generation and publishing stages.
//!
//! - [`NewsSourceConfig`] and [`SymbolRule`]: static configuration read once at startup
//! - [`NewsItem`]: a headline discovered during one fetch cycle
//! - [`ArticleDraft`], [`LocalizedContentMap`], [`StockReference`]: generated article content
//! - [`ArticleCreateInput`]: the payload handed to the publisher
//!
//! Serialized field names use camelCase to match the documents already stored
//! by the article front-end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A listing page to scrape headlines from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsSourceConfig {
    /// Display name, also recorded on every item from this source.
    pub name: String,
    /// URL of the listing page.
    pub url: String,
    /// CSS selector matching the headline links on the listing page.
    pub selector: String,
    /// Base used to resolve relative links. Empty means links must be absolute.
    #[serde(default)]
    pub base_url: String,
}

/// A ticker symbol and the keywords that imply it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SymbolRule {
    pub symbol: String,
    pub keywords: Vec<String>,
}

impl SymbolRule {
    pub fn new(symbol: &str, keywords: &[&str]) -> Self {
        Self {
            symbol: symbol.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// A financial headline discovered during a fetch cycle.
///
/// Items leave the extractor with an empty `summary`; the enricher replaces
/// the summary once and the item is read-only after that.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    pub url: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub stock_symbols: Vec<String>,
}

impl NewsItem {
    /// An item is publishable when both its title and link are present.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.url.trim().is_empty()
    }
}

/// Output language of a generated article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    He,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::He => "he",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::He => "Hebrew",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Title, body and summary of an article in a single language.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    pub summary: String,
}

/// Per-locale article content as stored in the `content` field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct LocalizedContentMap {
    pub en: ArticleDraft,
    pub he: ArticleDraft,
}

/// A stock an article is about.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockReference {
    pub symbol: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_at_publication: Option<f64>,
}

/// Everything the publisher needs to create an article document.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleCreateInput {
    pub content: LocalizedContentMap,
    pub image_url: String,
    pub stock_keywords: Vec<StockReference>,
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_published: Option<bool>,
    pub is_generated: Option<bool>,
}
