//! Article writer backed by an OpenAI-compatible chat completions API.

use crate::api::{AskAsync, ChatPrompt, OpenAiClient, RetryAsk};
use crate::error::GenerationError;
use crate::generation::{ArticleRequest, ArticleWriter, TagRequest};
use crate::models::ArticleDraft;
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{info, instrument};

const ARTICLE_SYSTEM_PROMPT: &str = "You are a financial analyst and journalist specializing in \
creating high-quality financial news articles.";
const TAG_SYSTEM_PROMPT: &str = "You are a financial content tagger specializing in creating \
relevant tags for financial articles.";

static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)TITLE:\s*(.*?)(?:\nSUMMARY:|$)").unwrap());
static SUMMARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)SUMMARY:\s*(.*?)(?:\nCONTENT:|$)").unwrap());
static CONTENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)CONTENT:\s*(.*)$").unwrap());

#[derive(Debug, Clone)]
pub struct OpenAiWriter {
    client: OpenAiClient,
    article_model: String,
    tag_model: String,
    max_retries: usize,
    base_delay: Duration,
}

impl OpenAiWriter {
    pub fn new(client: OpenAiClient) -> Self {
        Self {
            client,
            article_model: "gpt-4".to_string(),
            tag_model: "gpt-3.5-turbo".to_string(),
            max_retries: 5,
            base_delay: Duration::from_secs(1),
        }
    }

    pub fn with_models(mut self, article_model: &str, tag_model: &str) -> Self {
        self.article_model = article_model.to_string();
        self.tag_model = tag_model.to_string();
        self
    }

    pub fn with_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn ask(&self, model: &str, system: &str, max_tokens: u32, prompt: &str) -> Result<String, GenerationError> {
        let call = ChatPrompt {
            client: &self.client,
            model,
            system,
            temperature: 0.7,
            max_tokens,
        };
        RetryAsk::new(call, self.max_retries, self.base_delay).ask(prompt).await
    }
}

impl ArticleWriter for OpenAiWriter {
    #[instrument(level = "info", skip_all, fields(language = %request.language))]
    async fn write_article(&self, request: &ArticleRequest) -> Result<ArticleDraft, GenerationError> {
        let response = self
            .ask(&self.article_model, ARTICLE_SYSTEM_PROMPT, 1500, &article_prompt(request))
            .await?;
        let mut draft = parse_article_response(&response);
        if draft.title.is_empty() {
            draft.title = request.title.clone();
        }
        info!(chars = draft.content.chars().count(), "Article drafted");
        Ok(draft)
    }

    #[instrument(level = "info", skip_all)]
    async fn suggest_tags(&self, request: &TagRequest) -> Result<Vec<String>, GenerationError> {
        let response = self
            .ask(&self.tag_model, TAG_SYSTEM_PROMPT, 100, &tag_prompt(request))
            .await?;
        Ok(parse_tags(&response))
    }
}

fn article_prompt(request: &ArticleRequest) -> String {
    format!(
        "Create a financial news article based on the following information:\n\n\
         Title: {}\nSummary: {}\nSource: {}\nURL: {}\nStock Symbols: {}\n\n\
         Write the article in {}.\n\n\
         Cover the news itself, its likely impact on the mentioned stocks, market context \
         and a short outlook. The content should be at least 500 words of HTML using \
         <h2> and <p> elements.\n\n\
         Format your response exactly as:\n\n\
         TITLE: Your title here\nSUMMARY: A 2-3 sentence summary\nCONTENT: Your content here",
        request.title,
        request.summary,
        request.source,
        request.url,
        request.stock_symbols.join(", "),
        request.language.name(),
    )
}

fn tag_prompt(request: &TagRequest) -> String {
    format!(
        "Generate 5-7 relevant tags for a financial article with the following details:\n\n\
         Title: {}\nSummary: {}\nStock Symbols: {}\n\n\
         Return only the tags as a comma-separated list.",
        request.title,
        request.summary,
        request.stock_symbols.join(", "),
    )
}

/// Split a `TITLE:` / `SUMMARY:` / `CONTENT:` response into a draft.
///
/// Missing sections come back empty.
pub fn parse_article_response(response: &str) -> ArticleDraft {
    ArticleDraft {
        title: section(&TITLE_RE, response),
        summary: section(&SUMMARY_RE, response),
        content: section(&CONTENT_RE, response),
    }
}

fn section(re: &Regex, response: &str) -> String {
    re.captures(response)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

pub fn parse_tags(response: &str) -> Vec<String> {
    response
        .split(',')
        .map(|tag| tag.trim().trim_matches('"').to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}
