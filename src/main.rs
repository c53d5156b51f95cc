mod app;
mod config;
mod curator;
mod dates;
mod enricher;
mod feeds;
mod glm;
mod logger;
mod models;
mod render;
mod sources;
mod store;
mod summarizer;
mod trending;
mod utils;

use anyhow::Result;
use clap::Parser;

use crate::app::PipelineOptions;

#[derive(Parser)]
#[command(name = "newsreel")]
#[command(about = "AI/edtech news shorts aggregator with a rolling 10-day window")]
struct Cli {
    /// Skip the trending-model pipeline
    #[arg(long)]
    skip_models: bool,

    /// Run only the trending-model pipeline
    #[arg(long, conflicts_with = "skip_models")]
    models_only: bool,

    /// Skip og:image enrichment for curated articles
    #[arg(long)]
    no_images: bool,

    /// Also accept articles dated one day before the target day
    #[arg(long)]
    include_previous_day: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    app::run_pipeline(PipelineOptions {
        skip_models: cli.skip_models,
        models_only: cli.models_only,
        no_images: cli.no_images,
        include_previous_day: cli.include_previous_day,
    })
    .await
}
