//! Deterministic templated writer for running without an API key.

use crate::error::GenerationError;
use crate::generation::{ArticleRequest, ArticleWriter, TagRequest};
use crate::models::{ArticleDraft, Language};

const BASE_TAGS: [&str; 3] = ["finance", "investment", "market analysis"];
const MARKET_TAGS: [&str; 3] = ["financial markets", "trading", "investment strategy"];
const MAX_TAGS: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineWriter;

impl ArticleWriter for OfflineWriter {
    async fn write_article(&self, request: &ArticleRequest) -> Result<ArticleDraft, GenerationError> {
        Ok(render(request))
    }

    async fn suggest_tags(&self, request: &TagRequest) -> Result<Vec<String>, GenerationError> {
        Ok(tags_for(&request.stock_symbols))
    }
}

fn render(request: &ArticleRequest) -> ArticleDraft {
    let stocks = if request.stock_symbols.is_empty() {
        match request.language {
            Language::En => "various financial markets".to_string(),
            Language::He => "שווקים פיננסיים שונים".to_string(),
        }
    } else {
        request.stock_symbols.join(", ")
    };
    let title = &request.title;
    let source = &request.source;

    match request.language {
        Language::En => ArticleDraft {
            title: format!("Analysis: {title}"),
            summary: format!(
                "A detailed analysis of {} and its impact on {stocks}.",
                subject(request)
            ),
            content: format!(
                "<h2>Introduction</h2>\n\
                 <p>Recent developments in the financial markets have brought attention to {title}. \
                 This article looks at what happened and what it may mean for investors.</p>\n\
                 <h2>Market Analysis</h2>\n\
                 <p>The report from {source} highlights movement in {stocks}. Short-term volatility \
                 is possible while the market digests the news.</p>\n\
                 <h2>Outlook</h2>\n\
                 <p>Investors are advised to stay informed and keep their positions aligned with \
                 their overall strategy and risk tolerance.</p>"
            ),
        },
        Language::He => ArticleDraft {
            title: format!("ניתוח: {title}"),
            summary: format!("ניתוח מפורט של {} וההשפעה שלו על {stocks}.", subject(request)),
            content: format!(
                "<h2>הקדמה</h2>\n\
                 <p>התפתחויות אחרונות בשווקים הפיננסיים הביאו תשומת לב ל{title}. \
                 מאמר זה בוחן את האירועים ואת משמעותם עבור משקיעים.</p>\n\
                 <h2>ניתוח שוק</h2>\n\
                 <p>הדיווח מ{source} מצביע על תנועות ב{stocks}. ייתכנו תנודות בטווח הקצר \
                 בזמן שהשוק מעכל את החדשות.</p>\n\
                 <h2>תחזית</h2>\n\
                 <p>מומלץ למשקיעים להישאר מעודכנים ולשמור על התאמה לאסטרטגיה ולסובלנות הסיכון שלהם.</p>"
            ),
        },
    }
}

fn subject(request: &ArticleRequest) -> &str {
    if request.summary.is_empty() {
        &request.title
    } else {
        &request.summary
    }
}

fn tags_for(symbols: &[String]) -> Vec<String> {
    BASE_TAGS
        .iter()
        .map(|t| t.to_string())
        .chain(symbols.iter().map(|s| format!("{s} stock")))
        .chain(MARKET_TAGS.iter().map(|t| t.to_string()))
        .take(MAX_TAGS)
        .collect()
}
