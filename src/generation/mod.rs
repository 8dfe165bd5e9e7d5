//! Article content generation for a news item.
//!
//! A [`ArticleWriter`] turns a headline into a localized draft and a tag list.
//! [`compose_article`] runs it once per language and attaches the stock
//! keywords derived from the item's symbols.

pub mod image;
pub mod offline;
pub mod openai;

use crate::error::GenerationError;
use crate::models::{ArticleDraft, Language, LocalizedContentMap, NewsItem, StockReference};
use offline::OfflineWriter;
use openai::OpenAiWriter;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

pub const GENERAL_MARKET_SYMBOL: &str = "FINANCE";
pub const GENERAL_MARKET_NAME: &str = "Financial Markets";

/// Input for one localized article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRequest {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub url: String,
    pub stock_symbols: Vec<String>,
    pub language: Language,
}

impl ArticleRequest {
    pub fn from_item(item: &NewsItem, language: Language) -> Self {
        Self {
            title: item.title.clone(),
            summary: item.summary.clone(),
            source: item.source.clone(),
            url: item.url.clone(),
            stock_symbols: item.stock_symbols.clone(),
            language,
        }
    }
}

/// Input for tag suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRequest {
    pub title: String,
    pub summary: String,
    pub stock_symbols: Vec<String>,
}

/// Writes article drafts and suggests tags.
pub trait ArticleWriter {
    /// Write one article in the requested language.
    ///
    /// # Arguments
    ///
    /// * `request` - Headline, summary, symbols and target language
    ///
    /// # Returns
    ///
    /// A draft with title, summary and body, or the error that stopped it.
    async fn write_article(&self, request: &ArticleRequest) -> Result<ArticleDraft, GenerationError>;

    /// Suggest short topic tags for a headline.
    async fn suggest_tags(&self, request: &TagRequest) -> Result<Vec<String>, GenerationError>;
}

/// Uses `primary`, switching to `fallback` for any call that fails.
#[derive(Debug)]
pub struct WithFallback<P, S> {
    primary: P,
    fallback: S,
}

impl<P, S> WithFallback<P, S> {
    pub fn new(primary: P, fallback: S) -> Self {
        Self { primary, fallback }
    }
}

impl<P: ArticleWriter, S: ArticleWriter> ArticleWriter for WithFallback<P, S> {
    async fn write_article(&self, request: &ArticleRequest) -> Result<ArticleDraft, GenerationError> {
        match self.primary.write_article(request).await {
            Ok(draft) => Ok(draft),
            Err(e) => {
                warn!(error = %e, language = %request.language, "Article writer failed; using fallback");
                self.fallback.write_article(request).await
            }
        }
    }

    async fn suggest_tags(&self, request: &TagRequest) -> Result<Vec<String>, GenerationError> {
        match self.primary.suggest_tags(request).await {
            Ok(tags) => Ok(tags),
            Err(e) => {
                warn!(error = %e, "Tag writer failed; using fallback");
                self.fallback.suggest_tags(request).await
            }
        }
    }
}

/// The writer selected at startup.
#[derive(Debug)]
pub enum ConfiguredWriter {
    /// API writer that degrades to templates when a call fails.
    Api(WithFallback<OpenAiWriter, OfflineWriter>),
    Offline(OfflineWriter),
}

impl ConfiguredWriter {
    pub fn api(writer: OpenAiWriter) -> Self {
        Self::Api(WithFallback::new(writer, OfflineWriter))
    }
}

impl ArticleWriter for ConfiguredWriter {
    async fn write_article(&self, request: &ArticleRequest) -> Result<ArticleDraft, GenerationError> {
        match self {
            Self::Api(writer) => writer.write_article(request).await,
            Self::Offline(writer) => writer.write_article(request).await,
        }
    }

    async fn suggest_tags(&self, request: &TagRequest) -> Result<Vec<String>, GenerationError> {
        match self {
            Self::Api(writer) => writer.suggest_tags(request).await,
            Self::Offline(writer) => writer.suggest_tags(request).await,
        }
    }
}

/// Generated content for one news item, ready for an image and publishing.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedArticle {
    pub content: LocalizedContentMap,
    pub stock_keywords: Vec<StockReference>,
    pub tags: Vec<String>,
}

/// Stock keywords for `symbols`, named from `catalog`.
///
/// Unknown symbols are named after themselves; an empty symbol list yields
/// the general-market keyword.
pub fn stock_keywords(symbols: &[String], catalog: &BTreeMap<String, String>) -> Vec<StockReference> {
    if symbols.is_empty() {
        return vec![StockReference {
            symbol: GENERAL_MARKET_SYMBOL.to_string(),
            name: GENERAL_MARKET_NAME.to_string(),
            price_at_publication: None,
        }];
    }
    symbols
        .iter()
        .map(|symbol| StockReference {
            symbol: symbol.clone(),
            name: catalog.get(symbol).cloned().unwrap_or_else(|| symbol.clone()),
            price_at_publication: None,
        })
        .collect()
}

/// Generate English and Hebrew drafts plus tags for `item`.
#[instrument(level = "info", skip_all, fields(title = %item.title))]
pub async fn compose_article<W: ArticleWriter>(
    writer: &W,
    item: &NewsItem,
    catalog: &BTreeMap<String, String>,
) -> Result<ComposedArticle, GenerationError> {
    info!("Generating English content");
    let en = writer
        .write_article(&ArticleRequest::from_item(item, Language::En))
        .await?;
    info!("Generating Hebrew content");
    let he = writer
        .write_article(&ArticleRequest::from_item(item, Language::He))
        .await?;

    let tags = writer
        .suggest_tags(&TagRequest {
            title: item.title.clone(),
            summary: item.summary.clone(),
            stock_symbols: item.stock_symbols.clone(),
        })
        .await?;

    Ok(ComposedArticle {
        content: LocalizedContentMap { en, he },
        stock_keywords: stock_keywords(&item.stock_symbols, catalog),
        tags,
    })
}
