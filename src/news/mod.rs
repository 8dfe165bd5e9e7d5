//! Financial news ingestion.
//!
//! A fetch cycle runs in two stages:
//!
//! 1. **Collection**: every configured listing page is fetched and its
//!    headlines are extracted, in source order, up to a global cap of
//!    `limit_per_source * sources`. A source that cannot be fetched or parsed
//!    contributes nothing.
//! 2. **Enrichment**: the first `limit_per_source` collected headlines are
//!    enriched concurrently with a summary from their article page. Output
//!    order equals collection order.
//!
//! Neither stage returns an error; an unreachable internet yields an empty batch.

pub mod enrich;
pub mod extract;
pub mod fetcher;
pub mod symbols;

use crate::models::{NewsItem, NewsSourceConfig, SymbolRule};
use enrich::enrich;
use extract::HeadlineExtractor;
use fetcher::PageFetcher;
use futures::future::join_all;
use symbols::SymbolTagger;
use tracing::{info, instrument, warn};

/// Drives collection and enrichment across all configured sources.
#[derive(Debug)]
pub struct NewsFetcher<F> {
    fetcher: F,
    sources: Vec<NewsSourceConfig>,
    tagger: SymbolTagger,
}

impl<F: PageFetcher> NewsFetcher<F> {
    /// Create a fetcher over `sources`, tagging headlines with `rules`.
    pub fn new(fetcher: F, sources: Vec<NewsSourceConfig>, rules: Vec<SymbolRule>) -> Self {
        Self {
            fetcher,
            sources,
            tagger: SymbolTagger::new(rules),
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Fetch and enrich at most `limit_per_source` headlines.
    ///
    /// # Arguments
    ///
    /// * `limit_per_source` - Number of headlines to enrich; the collection
    ///   cap is this value times the number of sources
    ///
    /// # Returns
    ///
    /// Enriched items in collection order, each with a title and a URL. Never
    /// fails; unreachable sources and articles are logged and skipped.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_financial_news(&self, limit_per_source: usize) -> Vec<NewsItem> {
        let collected = self.collect_headlines(limit_per_source).await;
        let total = collected.len();

        let selected: Vec<NewsItem> = collected.into_iter().take(limit_per_source).collect();
        info!(collected = total, selected = selected.len(), "Enriching headlines");

        let enriched = join_all(selected.into_iter().map(|item| enrich(&self.fetcher, item))).await;
        let items: Vec<NewsItem> = enriched.into_iter().filter(NewsItem::is_complete).collect();

        info!(count = items.len(), "Fetched financial news");
        items
    }

    /// Collect bare headlines from every source, in source order.
    ///
    /// Listing pages are requested concurrently, but results are merged in
    /// configuration order so the cap always keeps the earliest sources.
    pub async fn collect_headlines(&self, limit_per_source: usize) -> Vec<NewsItem> {
        let cap = limit_per_source.saturating_mul(self.sources.len());
        let pages = join_all(self.sources.iter().map(|source| async move {
            info!(source = %source.name, "Fetching news source");
            self.fetcher.fetch(&source.url).await
        }))
        .await;

        let extractor = HeadlineExtractor::new(&self.tagger);
        self.sources
            .iter()
            .zip(pages)
            .fold(Vec::new(), |mut collected, (source, page)| {
                let html = match page {
                    Ok(html) => html,
                    Err(e) => {
                        warn!(source = %source.name, error = %e, "Skipping news source");
                        return collected;
                    }
                };
                let room = cap.saturating_sub(collected.len());
                match extractor.extract(&html, source, limit_per_source, room) {
                    Ok(items) => {
                        info!(source = %source.name, count = items.len(), "Extracted headlines");
                        collected.extend(items);
                    }
                    Err(e) => warn!(source = %source.name, error = %e, "Skipping news source"),
                }
                collected
            })
    }
}
