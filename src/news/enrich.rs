//! Article summary enrichment.

use crate::models::NewsItem;
use crate::news::fetcher::PageFetcher;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

/// Maximum summary length in characters before the ellipsis marker.
pub const SUMMARY_MAX_CHARS: usize = 200;
pub const ELLIPSIS: &str = "...";

static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Fetch the linked article and fill in `item.summary`.
///
/// Never fails: when the article cannot be fetched the item is returned
/// exactly as it was given.
#[instrument(level = "info", skip_all, fields(title = %item.title))]
pub async fn enrich<F: PageFetcher>(fetcher: &F, item: NewsItem) -> NewsItem {
    match fetcher.fetch(&item.url).await {
        Ok(html) => {
            let summary = truncate_summary(&extract_summary(&html));
            debug!(chars = summary.chars().count(), "Enriched news item");
            NewsItem { summary, ..item }
        }
        Err(e) => {
            warn!(url = %item.url, error = %e, "Enrichment failed; keeping bare headline");
            item
        }
    }
}

/// The page's meta description, or its first paragraph, or nothing.
pub fn extract_summary(html: &str) -> String {
    let document = Html::parse_document(html);

    let description = document
        .select(&META_DESCRIPTION)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(str::trim)
        .unwrap_or_default();
    if !description.is_empty() {
        return description.to_string();
    }

    document
        .select(&PARAGRAPH)
        .next()
        .map(|p| p.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Cut `summary` to [`SUMMARY_MAX_CHARS`] characters, marking the cut with [`ELLIPSIS`].
pub fn truncate_summary(summary: &str) -> String {
    if summary.chars().count() <= SUMMARY_MAX_CHARS {
        return summary.to_string();
    }
    let mut cut: String = summary.chars().take(SUMMARY_MAX_CHARS).collect();
    cut.push_str(ELLIPSIS);
    cut
}
