//! Article publishing.
//!
//! Turns an [`ArticleCreateInput`] into an article document and stores it.
//! The stored shape is what the article front-end reads:
//!
//! | Field | Value |
//! |-------|-------|
//! | `slug` | slug of the English title (Hebrew title if that is empty) |
//! | `content` | `{ en, he }` drafts |
//! | `imageUrl`, `stockKeywords`, `author`, `tags` | copied from the input |
//! | `isPublished` | input value, default `true` |
//! | `isGenerated` | input value, default `false` |
//! | `viewCount` | `0` |
//! | `publishedAt` | publication time, RFC 3339 UTC |
//!
//! `id`, `createdAt` and `updatedAt` are added by the store.

use crate::error::StoreError;
use crate::models::ArticleCreateInput;
use crate::store::{DocumentStore, timestamp};
use crate::utils::slugify_title;
use serde_json::json;
use tracing::{info, instrument};

const FALLBACK_SLUG: &str = "article";

/// Create the article document and return its id.
///
/// # Arguments
///
/// * `store` - Article collection
/// * `input` - Drafts, image, keywords, tags and flags for the article
///
/// # Returns
///
/// The id assigned by the store, or the store's error.
#[instrument(level = "info", skip_all, fields(title = %input.content.en.title))]
pub async fn publish_article<S: DocumentStore>(
    store: &S,
    input: &ArticleCreateInput,
) -> Result<String, StoreError> {
    let slug = article_slug(input);
    let doc = json!({
        "slug": slug,
        "content": input.content,
        "imageUrl": input.image_url,
        "stockKeywords": input.stock_keywords,
        "author": input.author,
        "tags": input.tags,
        "isPublished": input.is_published.unwrap_or(true),
        "isGenerated": input.is_generated.unwrap_or(false),
        "viewCount": 0,
        "publishedAt": timestamp(),
    });
    let id = store.create(doc).await?;
    info!(%id, %slug, "Published article");
    Ok(id)
}

fn article_slug(input: &ArticleCreateInput) -> String {
    [&input.content.en.title, &input.content.he.title]
        .into_iter()
        .map(|title| slugify_title(title))
        .find(|slug| !slug.is_empty())
        .unwrap_or_else(|| FALLBACK_SLUG.to_string())
}
