//! Article illustration.
//!
//! Image generation is best effort: every generator returns a usable URL and
//! falls back to [`FALLBACK_IMAGE_URL`] instead of failing.

use crate::api::OpenAiClient;
use rand::{Rng, rng};
use tracing::{info, instrument, warn};

pub const FALLBACK_IMAGE_URL: &str =
    "https://via.placeholder.com/1200x630/007bff/ffffff?text=Financial+News";
const PLACEHOLDER_BASE: &str = "https://via.placeholder.com/1200x630/007bff/ffffff";
const TITLE_CHARS: usize = 50;

/// Produces an image URL for an article title.
pub trait ImageGenerator {
    /// Return an image URL for `title`. Never fails; implementations fall back
    /// to a fixed URL.
    async fn generate(&self, title: &str) -> String;
}

/// Placeholder banner carrying the start of the title.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderImages;

impl ImageGenerator for PlaceholderImages {
    async fn generate(&self, title: &str) -> String {
        let seed: u32 = rng().random_range(0..1000);
        placeholder_url(title, seed)
    }
}

pub fn placeholder_url(title: &str, seed: u32) -> String {
    let short: String = title.chars().take(TITLE_CHARS).collect();
    if short.trim().is_empty() {
        return FALLBACK_IMAGE_URL.to_string();
    }
    format!(
        "{PLACEHOLDER_BASE}?text={}&seed={seed}",
        urlencoding::encode(&short)
    )
}

/// Images from an OpenAI-compatible `/images/generations` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiImages {
    client: OpenAiClient,
    size: String,
}

impl OpenAiImages {
    pub fn new(client: OpenAiClient) -> Self {
        Self {
            client,
            size: "1024x1024".to_string(),
        }
    }
}

impl ImageGenerator for OpenAiImages {
    #[instrument(level = "info", skip(self))]
    async fn generate(&self, title: &str) -> String {
        let prompt = format!("Financial news article illustration about: {title}");
        match self.client.image(&prompt, &self.size).await {
            Ok(url) => {
                info!(%url, "Generated article image");
                url
            }
            Err(e) => {
                warn!(error = %e, "Image generation failed; using fallback image");
                FALLBACK_IMAGE_URL.to_string()
            }
        }
    }
}

/// The image generator selected at startup.
#[derive(Debug, Clone)]
pub enum ConfiguredImages {
    Placeholder(PlaceholderImages),
    OpenAi(OpenAiImages),
}

impl ImageGenerator for ConfiguredImages {
    async fn generate(&self, title: &str) -> String {
        match self {
            Self::Placeholder(images) => images.generate(title).await,
            Self::OpenAi(images) => images.generate(title).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_encodes_truncated_title() {
        let url = placeholder_url("Apple & Nvidia lead a broad tech rally as yields fall sharply today", 42);
        assert!(url.starts_with("https://via.placeholder.com/1200x630/007bff/ffffff?text=Apple%20%26%20Nvidia"));
        assert!(url.ends_with("&seed=42"));
        assert!(!url.contains("today"));
    }

    #[test]
    fn test_blank_title_uses_fallback() {
        assert_eq!(placeholder_url("   ", 1), FALLBACK_IMAGE_URL);
    }

    #[tokio::test]
    async fn test_placeholder_generator_always_returns_url() {
        let url = PlaceholderImages.generate("Markets").await;
        assert!(url.contains("text=Markets&seed="));
    }

    #[tokio::test]
    async fn test_openai_images_fall_back_when_unreachable() {
        let client = OpenAiClient::new(reqwest::Client::new(), "sk-test", "http://127.0.0.1:9/v1");
        let images = ConfiguredImages::OpenAi(OpenAiImages::new(client));
        assert_eq!(images.generate("Markets").await, FALLBACK_IMAGE_URL);
    }
}
