//! One generation cycle: fetch news, write articles, illustrate and publish.
//!
//! Items are processed one after another. A failing item is logged and
//! counted, and the cycle moves on to the next one. Only one cycle may run at
//! a time per [`Pipeline`].

use crate::error::{ItemError, PipelineError};
use crate::generation::image::ImageGenerator;
use crate::generation::{ArticleWriter, compose_article};
use crate::models::{ArticleCreateInput, NewsItem};
use crate::news::NewsFetcher;
use crate::news::fetcher::PageFetcher;
use crate::publish::publish_article;
use crate::store::DocumentStore;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{error, info, instrument};

/// Outcome of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    /// Ids of the published articles, in news order.
    pub published: Vec<String>,
    pub failed: usize,
}

/// Wires news ingestion, article writing, images and publishing together.
#[derive(Debug)]
pub struct Pipeline<F, W, I, S> {
    news: NewsFetcher<F>,
    writer: W,
    images: I,
    store: S,
    stocks: BTreeMap<String, String>,
    author: String,
    limit_per_source: usize,
    running: AtomicBool,
}

/// Marks a cycle as running until dropped.
struct RunPermit<'a>(&'a AtomicBool);

impl Drop for RunPermit<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<F, W, I, S> Pipeline<F, W, I, S>
where
    F: PageFetcher,
    W: ArticleWriter,
    I: ImageGenerator,
    S: DocumentStore,
{
    /// Build a pipeline.
    ///
    /// # Arguments
    ///
    /// * `news` - Headline source for each cycle
    /// * `writer` - Writes the English and Hebrew drafts and tags
    /// * `images` - Produces an image URL from the English title
    /// * `store` - Collection that articles are published to
    /// * `stocks` - Display names keyed by ticker, for stock keywords
    /// * `author` - Author recorded on every article
    /// * `limit_per_source` - Headline budget passed to the news fetcher
    pub fn new(
        news: NewsFetcher<F>,
        writer: W,
        images: I,
        store: S,
        stocks: BTreeMap<String, String>,
        author: String,
        limit_per_source: usize,
    ) -> Self {
        Self {
            news,
            writer,
            images,
            store,
            stocks,
            author,
            limit_per_source,
            running: AtomicBool::new(false),
        }
    }

    /// The store articles are published to.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn try_start(&self) -> Option<RunPermit<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit(&self.running))
    }

    /// Run one full cycle.
    ///
    /// Fails only with [`PipelineError::RunInProgress`]; item failures are
    /// reported through [`CycleReport::failed`].
    #[instrument(level = "info", skip(self))]
    pub async fn run_cycle(&self) -> Result<CycleReport, PipelineError> {
        let Some(_permit) = self.try_start() else {
            return Err(PipelineError::RunInProgress);
        };
        let t0 = Instant::now();
        info!("Starting article generation cycle");

        let items = self.news.fetch_financial_news(self.limit_per_source).await;
        info!(count = items.len(), "Fetched news items");

        let mut report = CycleReport {
            fetched: items.len(),
            ..CycleReport::default()
        };
        for item in &items {
            match self.process_item(item).await {
                Ok(id) => report.published.push(id),
                Err(e) => {
                    error!(title = %item.title, error = %e, "Error processing news item");
                    report.failed += 1;
                }
            }
        }

        info!(
            fetched = report.fetched,
            published = report.published.len(),
            failed = report.failed,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Article generation cycle completed"
        );
        Ok(report)
    }

    #[instrument(level = "info", skip_all, fields(title = %item.title, source = %item.source))]
    async fn process_item(&self, item: &NewsItem) -> Result<String, ItemError> {
        let composed = compose_article(&self.writer, item, &self.stocks).await?;

        info!("Generating image for article");
        let image_url = self.images.generate(&composed.content.en.title).await;

        let input = ArticleCreateInput {
            content: composed.content,
            image_url,
            stock_keywords: composed.stock_keywords,
            author: self.author.clone(),
            tags: composed.tags,
            is_published: Some(true),
            is_generated: Some(true),
        };
        let id = publish_article(&self.store, &input).await?;
        info!(%id, "Successfully published article");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_stock_names, default_symbol_rules};
    use crate::generation::testing::ScriptedWriter;
    use crate::models::NewsSourceConfig;
    use crate::news::fetcher::testing::FakeFetcher;
    use crate::store::memory::MemoryStore;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct RecordingImages {
        titles: RefCell<Vec<String>>,
    }

    impl ImageGenerator for &RecordingImages {
        async fn generate(&self, title: &str) -> String {
            self.titles.borrow_mut().push(title.to_string());
            format!("https://img.test/{}", self.titles.borrow().len())
        }
    }

    fn source() -> NewsSourceConfig {
        NewsSourceConfig {
            name: "CNBC".to_string(),
            url: "https://cnbc.test/markets".to_string(),
            selector: "a.headline".to_string(),
            base_url: "https://cnbc.test".to_string(),
        }
    }

    fn fetcher() -> FakeFetcher {
        FakeFetcher::new().page(
            "https://cnbc.test/markets",
            r#"<a class="headline" href="/1">Tesla rallies after Elon Musk comments</a>
               <a class="headline" href="/2">Treasury yields slip</a>"#,
        )
    }

    fn pipeline<'a, W: ArticleWriter>(
        fetcher: FakeFetcher,
        writer: W,
        images: &'a RecordingImages,
    ) -> Pipeline<FakeFetcher, W, &'a RecordingImages, MemoryStore> {
        Pipeline::new(
            NewsFetcher::new(fetcher, vec![source()], default_symbol_rules()),
            writer,
            images,
            MemoryStore::new(),
            default_stock_names(),
            "AI Financial Analyst".to_string(),
            5,
        )
    }

    #[tokio::test]
    async fn test_cycle_publishes_every_item() {
        let images = RecordingImages::default();
        let pipeline = pipeline(fetcher(), ScriptedWriter::default(), &images);

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report.fetched, 2);
        assert_eq!(report.published.len(), 2);
        assert_eq!(report.failed, 0);

        let first = pipeline
            .store()
            .get_by_id(&report.published[0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first["content"]["en"]["title"], "[en] Tesla rallies after Elon Musk comments");
        assert_eq!(first["stockKeywords"][0]["symbol"], "TSLA");
        assert_eq!(first["stockKeywords"][0]["name"], "Tesla, Inc.");
        assert_eq!(first["imageUrl"], "https://img.test/1");
        assert_eq!(first["author"], "AI Financial Analyst");
        assert_eq!(first["isPublished"], true);
        assert_eq!(first["isGenerated"], true);

        let second = pipeline
            .store()
            .get_by_id(&report.published[1])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second["stockKeywords"][0]["symbol"], "FINANCE");

        assert_eq!(
            *images.titles.borrow(),
            vec![
                "[en] Tesla rallies after Elon Musk comments".to_string(),
                "[en] Treasury yields slip".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_item_failures_are_counted_not_raised() {
        let images = RecordingImages::default();
        let pipeline = pipeline(fetcher(), ScriptedWriter::broken(), &images);

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report.fetched, 2);
        assert!(report.published.is_empty());
        assert_eq!(report.failed, 2);
        assert!(images.titles.borrow().is_empty());
        assert!(pipeline.store().get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_an_error() {
        let images = RecordingImages::default();
        let pipeline = pipeline(FakeFetcher::new(), ScriptedWriter::default(), &images);

        let report = pipeline.run_cycle().await.unwrap();
        assert_eq!(report, CycleReport::default());
    }

    #[tokio::test]
    async fn test_overlapping_cycle_is_rejected() {
        let images = RecordingImages::default();
        let pipeline = pipeline(fetcher(), ScriptedWriter::default(), &images);

        let permit = pipeline.try_start().unwrap();
        assert!(matches!(
            pipeline.run_cycle().await,
            Err(PipelineError::RunInProgress)
        ));
        drop(permit);

        assert!(pipeline.run_cycle().await.is_ok());
    }
}
