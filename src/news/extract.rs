//! Headline extraction from listing-page markup.

use crate::error::ExtractError;
use crate::models::{NewsItem, NewsSourceConfig};
use crate::news::symbols::SymbolTagger;
use chrono::Utc;
use scraper::{Html, Selector};
use tracing::{debug, trace};
use url::{ParseError, Url};

/// Turns a listing page into bare [`NewsItem`]s using a source's selector.
#[derive(Debug, Clone, Copy)]
pub struct HeadlineExtractor<'a> {
    tagger: &'a SymbolTagger,
}

impl<'a> HeadlineExtractor<'a> {
    pub fn new(tagger: &'a SymbolTagger) -> Self {
        Self { tagger }
    }

    /// Extract headlines from `html`.
    ///
    /// # Arguments
    ///
    /// * `html` - Listing page markup
    /// * `source` - Source whose selector and base URL apply
    /// * `max_candidates` - Half the number of matching elements to consider
    /// * `room` - Maximum number of items to return
    ///
    /// # Returns
    ///
    /// Items with the element's visible text as title and an empty summary.
    /// Candidates without text or without a resolvable http(s) link are
    /// dropped. Fails only when the selector does not parse.
    pub fn extract(
        &self,
        html: &str,
        source: &NewsSourceConfig,
        max_candidates: usize,
        room: usize,
    ) -> Result<Vec<NewsItem>, ExtractError> {
        let selector =
            Selector::parse(&source.selector).map_err(|e| ExtractError::InvalidSelector {
                selector: source.selector.clone(),
                message: format!("{e:?}"),
            })?;
        let document = Html::parse_document(html);
        let discovered_at = Utc::now();

        let mut items = Vec::new();
        for element in document.select(&selector).take(max_candidates.saturating_mul(2)) {
            if items.len() >= room {
                debug!(source = %source.name, room, "Collection cap reached");
                break;
            }

            let title = element.text().collect::<String>();
            let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
            let href = element.value().attr("href").unwrap_or_default();
            let Some(url) = resolve_link(href, &source.base_url) else {
                trace!(source = %source.name, href, "Skipping candidate without a usable link");
                continue;
            };
            if title.is_empty() {
                trace!(source = %source.name, %url, "Skipping candidate without text");
                continue;
            }

            let stock_symbols = self.tagger.find_symbols(&title);
            items.push(NewsItem {
                title,
                summary: String::new(),
                url,
                source: source.name.clone(),
                published_at: discovered_at,
                stock_symbols,
            });
        }
        Ok(items)
    }
}

/// Resolve a headline link to an absolute http(s) URL.
///
/// Absolute links are kept as they are; relative links are joined onto
/// `base_url`, and are unusable when no base is configured.
pub fn resolve_link(href: &str, base_url: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let resolved = match Url::parse(href) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase) if !base_url.is_empty() => {
            Url::parse(base_url).ok()?.join(href).ok()?
        }
        Err(_) => return None,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_symbol_rules;

    fn source(selector: &str, base_url: &str) -> NewsSourceConfig {
        NewsSourceConfig {
            name: "Financial Times".to_string(),
            url: "https://www.ft.com/markets".to_string(),
            selector: selector.to_string(),
            base_url: base_url.to_string(),
        }
    }

    fn listing(count: usize) -> String {
        let teasers: String = (0..count)
            .map(|i| {
                format!(
                    r#"<div class="o-teaser__heading"><a href="/content/{i}">Story number {i}</a></div>"#
                )
            })
            .collect();
        format!("<html><body>{teasers}</body></html>")
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(
            resolve_link("/content/abc", "https://www.ft.com").as_deref(),
            Some("https://www.ft.com/content/abc")
        );
        assert_eq!(
            resolve_link("https://www.cnbc.com/2025/01/01/x.html", "https://www.ft.com").as_deref(),
            Some("https://www.cnbc.com/2025/01/01/x.html")
        );
        assert_eq!(resolve_link("/content/abc", ""), None);
        assert_eq!(resolve_link("", "https://www.ft.com"), None);
        assert_eq!(resolve_link("javascript:void(0)", "https://www.ft.com"), None);
        assert_eq!(resolve_link("mailto:desk@ft.com", "https://www.ft.com"), None);
    }

    #[test]
    fn test_extracts_titles_links_and_symbols() {
        let html = r#"
            <div class="o-teaser__heading">
                <a href="/content/1">  Apple   shares climb
                </a>
            </div>
            <div class="o-teaser__heading"><a href="https://www.ft.com/content/2">Bond yields slip</a></div>
        "#;
        let tagger = SymbolTagger::new(default_symbol_rules());
        let items = HeadlineExtractor::new(&tagger)
            .extract(html, &source(".o-teaser__heading a", "https://www.ft.com"), 5, 15)
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Apple shares climb");
        assert_eq!(items[0].url, "https://www.ft.com/content/1");
        assert_eq!(items[0].stock_symbols, vec!["AAPL".to_string()]);
        assert_eq!(items[0].source, "Financial Times");
        assert!(items[0].summary.is_empty());
        assert_eq!(items[1].url, "https://www.ft.com/content/2");
        assert!(items[1].stock_symbols.is_empty());
    }

    #[test]
    fn test_inline_markup_does_not_split_words() {
        let html = r#"<h3><a href="/1">Face<b>book</b> owner Meta<em>'s</em> shares jump</a></h3>"#;
        let tagger = SymbolTagger::new(default_symbol_rules());
        let items = HeadlineExtractor::new(&tagger)
            .extract(html, &source("h3 a", "https://www.ft.com"), 5, 15)
            .unwrap();
        assert_eq!(items[0].title, "Facebook owner Meta's shares jump");
        assert_eq!(items[0].stock_symbols, vec!["META".to_string()]);
    }

    #[test]
    fn test_huge_candidate_limit_does_not_overflow() {
        let tagger = SymbolTagger::new(vec![]);
        let items = HeadlineExtractor::new(&tagger)
            .extract(&listing(3), &source(".o-teaser__heading a", "https://www.ft.com"), usize::MAX, usize::MAX)
            .unwrap();
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_drops_candidates_without_text_or_link() {
        let html = r#"
            <h3><a href="/content/1"></a></h3>
            <h3><a>No link here</a></h3>
            <h3><a href="/content/3">Kept</a></h3>
        "#;
        let tagger = SymbolTagger::new(vec![]);
        let items = HeadlineExtractor::new(&tagger)
            .extract(html, &source("h3 a", "https://www.ft.com"), 5, 15)
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Kept");
    }

    #[test]
    fn test_relative_links_without_base_are_dropped() {
        let html = r#"<h3><a href="/content/1">Relative</a></h3><h3><a href="https://x.test/2">Absolute</a></h3>"#;
        let tagger = SymbolTagger::new(vec![]);
        let items = HeadlineExtractor::new(&tagger)
            .extract(html, &source("h3 a", ""), 5, 15)
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://x.test/2");
    }

    #[test]
    fn test_over_fetches_twice_the_candidate_limit() {
        let tagger = SymbolTagger::new(vec![]);
        let items = HeadlineExtractor::new(&tagger)
            .extract(&listing(20), &source(".o-teaser__heading a", "https://www.ft.com"), 3, 100)
            .unwrap();
        assert_eq!(items.len(), 6);
        assert_eq!(items[5].title, "Story number 5");
    }

    #[test]
    fn test_stops_at_remaining_room() {
        let tagger = SymbolTagger::new(vec![]);
        let extractor = HeadlineExtractor::new(&tagger);
        let src = source(".o-teaser__heading a", "https://www.ft.com");

        let items = extractor.extract(&listing(20), &src, 5, 4).unwrap();
        assert_eq!(items.len(), 4);

        let items = extractor.extract(&listing(20), &src, 5, 0).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let tagger = SymbolTagger::new(vec![]);
        let result = HeadlineExtractor::new(&tagger).extract(
            &listing(1),
            &source("a[href", "https://www.ft.com"),
            5,
            15,
        );
        assert!(matches!(result, Err(ExtractError::InvalidSelector { .. })));
    }

    #[test]
    fn test_all_items_share_one_discovery_time() {
        let tagger = SymbolTagger::new(vec![]);
        let items = HeadlineExtractor::new(&tagger)
            .extract(&listing(3), &source(".o-teaser__heading a", "https://www.ft.com"), 5, 15)
            .unwrap();
        assert!(items.iter().all(|i| i.published_at == items[0].published_at));
    }
}
