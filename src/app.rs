use anyhow::Result;
use log::{debug, info};

use crate::config::{Config, EnsureOutcome};
use crate::curator::curate_news;
use crate::dates::{now_kst_timestamp, today_kst};
use crate::enricher::enrich_articles;
use crate::feeds::fetch_all_news;
use crate::glm::GlmClient;
use crate::logger::init_logger;
use crate::models::NewsStore;
use crate::render::write_html;
use crate::summarizer::{prepare_for_summary, summarize_batches};
use crate::trending::fetch_trending_model_news;

const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub skip_models: bool,
    pub models_only: bool,
    pub no_images: bool,
    pub include_previous_day: bool,
}

/// One full nightly run. Everything is sequential; the fetch loops and the
/// LLM batches rate-limit themselves, and the store is written exactly once
/// at the end so a failed run never corrupts the previous window.
pub async fn run_pipeline(opts: PipelineOptions) -> Result<()> {
    // 0) Initialize logger
    init_logger()?;
    debug!("Logger initialized");

    // 1) Ensure config exists
    let config_outcome: EnsureOutcome = Config::ensure_user_config()?;
    if config_outcome.created {
        info!(
            "Config file created at {}. Please edit it and rerun.",
            config_outcome.path.display()
        );
        return Ok(());
    }
    let cfg = Config::get_user_config()?;
    let api_key = cfg.resolve_api_key()?;
    debug!("User config loaded");

    // 2) Load the window store and its global link set
    let mut store = NewsStore::load(&cfg.data_path);
    let existing_links = store.existing_links();
    debug!("Loaded {} existing links from the window", existing_links.len());

    // 3) Shared HTTP client + LLM client
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .user_agent(BROWSER_UA)
        .build()?;
    let glm = GlmClient::new(client.clone(), api_key, cfg.model.clone());

    let today = today_kst();
    info!("Fetching news for {today}...");

    // 4) News pipeline: fetch -> curate -> enrich -> summarize -> merge
    if !opts.models_only {
        let news_items = fetch_all_news(&client, &today, &existing_links, opts.include_previous_day).await;
        info!("  Total collected: {} articles", news_items.len());

        if news_items.is_empty() {
            info!("  No new articles found for today");
        } else {
            info!("  Curating news (deduplicate & select top 30)...");
            let mut curated = curate_news(&glm, news_items).await;

            prepare_for_summary(&mut curated);

            if opts.no_images {
                info!("  --no-images set, skipping og:image crawl");
            } else {
                info!("  Crawling og:image for curated articles...");
                enrich_articles(&client, &mut curated).await;
            }

            info!("  Batch summarizing curated articles (10 at a time)...");
            summarize_batches(&glm, &mut curated).await;

            let added = curated.len();
            store.merge_news(&today, now_kst_timestamp(), curated);
            info!("  Completed: {added} new articles for {today}");
        }
    }

    // 5) Trending-model pipeline, merged into the same day
    if opts.skip_models {
        info!("--skip-models set, skipping trending models");
    } else {
        info!("Fetching trending models...");
        // refresh so links merged in step 4 also count
        let links = store.existing_links();
        let model_items = fetch_trending_model_news(&client, &glm, &links, &today).await;
        info!("  Trending models: {} new items", model_items.len());
        if !model_items.is_empty() {
            store.merge_model_items(&today, now_kst_timestamp(), model_items, true);
        }
    }

    // 6) Enforce the window, persist, render
    store.maintain_window();
    store.save(&cfg.data_path)?;
    let total: usize = store.dates.iter().map(|day| day.news.len()).sum();
    info!(
        "Saved {} days of data ({total} articles, 10-day rolling window)",
        store.dates.len()
    );

    write_html(&store, &cfg.html_path)?;
    info!("Processing complete");

    Ok(())
}
