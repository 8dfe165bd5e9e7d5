//! # Market News Worker
//!
//! A scheduled content pipeline that scrapes financial headlines, enriches
//! them with a summary from the article page, writes English and Hebrew
//! articles about them, illustrates each one and publishes the result to a
//! document store.
//!
//! ## Usage
//!
//! ```sh
//! # Stay resident and run every day at 06:00 local time
//! market_news_worker --store-dir ./data
//!
//! # One cycle, then exit
//! market_news_worker --run-once
//! ```
//!
//! ## Architecture
//!
//! Each cycle follows a pipeline:
//! 1. **Collection**: scrape headlines from every listing page, tagging stock symbols
//! 2. **Enrichment**: fetch a summary for the selected headlines concurrently
//! 3. **Generation**: write an English and a Hebrew article plus tags per headline
//! 4. **Publishing**: attach an image and store the article document
//!
//! Articles are written through an OpenAI-compatible API when a key is
//! configured, with a templated offline writer as fallback.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod generation;
mod models;
mod news;
mod pipeline;
mod publish;
mod schedule;
mod store;
mod utils;

use api::OpenAiClient;
use cli::Cli;
use config::WorkerConfig;
use generation::ConfiguredWriter;
use generation::image::{ConfiguredImages, OpenAiImages, PlaceholderImages};
use generation::offline::OfflineWriter;
use generation::openai::OpenAiWriter;
use news::NewsFetcher;
use news::fetcher::HttpFetcher;
use pipeline::{CycleReport, Pipeline};
use schedule::{run_daily, shutdown_signal};
use store::DocumentStore;
use store::json::JsonFileStore;
use store::memory::MemoryStore;
use utils::ensure_writable_dir;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339());
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn log_report(report: &CycleReport) {
    info!(
        fetched = report.fetched,
        published = report.published.len(),
        failed = report.failed,
        ids = ?report.published,
        "Article generation process completed"
    );
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    init_tracing(args.log_json);
    info!(version = env!("CARGO_PKG_VERSION"), "market_news_worker starting up");

    let config = match WorkerConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration rejected");
            return Err(e.into());
        }
    };
    let limit = args.limit.unwrap_or(config.limit_per_source);
    if limit == 0 {
        error!("--limit must be positive");
        return Err("--limit must be positive".into());
    }

    let fetcher = HttpFetcher::new(
        Duration::from_secs(config.request_timeout_secs),
        &config.user_agent,
    )?;
    let api = args
        .api_key()
        .map(|key| OpenAiClient::new(fetcher.client().clone(), key, &args.openai_base_url));

    let writer = match &api {
        Some(client) if args.uses_api_writer() => {
            info!(
                base_url = %args.openai_base_url,
                article_model = %args.article_model,
                tag_model = %args.tag_model,
                "Using API article writer"
            );
            ConfiguredWriter::api(
                OpenAiWriter::new(client.clone())
                    .with_models(&args.article_model, &args.tag_model)
                    .with_retries(args.api_max_retries),
            )
        }
        _ => {
            info!("Using offline article writer");
            ConfiguredWriter::Offline(OfflineWriter)
        }
    };

    let images = match &api {
        Some(client) if args.ai_images => ConfiguredImages::OpenAi(OpenAiImages::new(client.clone())),
        _ => {
            if args.ai_images {
                warn!("AI images requested without an API key; using placeholder images");
            }
            ConfiguredImages::Placeholder(PlaceholderImages)
        }
    };

    let news = NewsFetcher::new(fetcher, config.sources, config.symbols);
    info!(sources = news.source_count(), limit, "News sources configured");

    if args.dry_run {
        info!("Dry run: articles are kept in memory");
        let pipeline = Pipeline::new(
            news,
            writer,
            images,
            MemoryStore::new(),
            config.stocks,
            config.author,
            limit,
        );
        return run(&args, pipeline).await;
    }

    // Early check: the store directory must be writable before any scraping
    if let Err(e) = ensure_writable_dir(Path::new(&args.store_dir)).await {
        error!(
            path = %args.store_dir,
            error = %e,
            "Store directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }
    let store = JsonFileStore::open(&args.store_dir, &args.collection).await?;
    let pipeline = Pipeline::new(
        news,
        writer,
        images,
        store,
        config.stocks,
        config.author,
        limit,
    );
    run(&args, pipeline).await
}

type Worker<S> = Pipeline<HttpFetcher, ConfiguredWriter, ConfiguredImages, S>;

/// Run once (or dry) and return, or stay resident on the daily schedule.
async fn run<S: DocumentStore>(args: &Cli, pipeline: Worker<S>) -> Result<(), Box<dyn Error>> {
    if args.run_once || args.dry_run {
        info!("Running one-time article generation");
        tokio::select! {
            result = pipeline.run_cycle() => match result {
                Ok(report) => {
                    log_report(&report);
                    if args.dry_run {
                        print_articles(pipeline.store()).await?;
                    }
                    info!("One-time article generation completed");
                }
                Err(e) => {
                    error!(error = %e, "Error in one-time article generation");
                    return Err(e.into());
                }
            },
            _ = shutdown_signal() => {
                info!("Worker process terminated");
            }
        }
        return Ok(());
    }

    info!(at = %args.schedule_at, "Worker started in scheduled mode");
    let pipeline = &pipeline;
    run_daily(args.schedule_at, move || async move {
        match pipeline.run_cycle().await {
            Ok(report) => log_report(&report),
            Err(e) => warn!(error = %e, "Scheduled run skipped"),
        }
    })
    .await;

    Ok(())
}

/// Write every stored article to stdout as one JSON document per line.
async fn print_articles<S: DocumentStore>(store: &S) -> Result<(), Box<dyn Error>> {
    for doc in store.get_all().await? {
        println!("{}", serde_json::to_string(&doc)?);
    }
    Ok(())
}
