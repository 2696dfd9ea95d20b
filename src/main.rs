mod annotator;
mod config;
mod error;
mod fetcher;
mod finder;
mod indexer;
mod record;
mod store;
mod store_clients;
#[cfg(test)]
mod testing;
mod web_server;

use crate::annotator::VisionAnnotatorFactory;
use crate::config::AppConfig;
use crate::fetcher::HttpFetcher;
use crate::finder::Finder;
use crate::indexer::Indexer;
use crate::store::{DocumentStore, SearchIndex};
use crate::store_clients::{elasticsearch::ElasticsearchDocumentStore, tantivy::TantivySearchIndex};
use anyhow::Result;
use clap::Parser;
use log::info;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(version, about = "Tags images with Cloud Vision labels and indexes them")]
struct Cli {
    /// Directory holding default.toml and the per-environment overrides
    #[arg(long, default_value = "config")]
    config_dir: String,

    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::new(&cli.config_dir)?;
    if let Some(port) = cli.port {
        config.web_port = port;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    env_logger::Builder::new()
        .filter_level(config.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    info!("Starting image-tagger");
    if config.vision_api_key.trim().is_empty() {
        log::warn!("VISION_API_KEY is not set; every indexing request will fail.");
    }

    let http_client = reqwest::Client::new();
    let documents: Arc<dyn DocumentStore> = Arc::new(ElasticsearchDocumentStore::new(&config)?);
    let search_index: Arc<dyn SearchIndex> = Arc::new(TantivySearchIndex::new(&config)?);
    documents.ensure_index_exists().await?;

    let indexer = Indexer::new(
        Arc::new(HttpFetcher::new(http_client.clone())),
        Arc::new(VisionAnnotatorFactory::new(&config, http_client)),
        documents.clone(),
        search_index.clone(),
    );
    let finder = Finder::new(documents, search_index);

    // Run the web server in the foreground
    if let Err(e) = web_server::start_web_server(Arc::new(config), indexer, finder).await {
        log::error!("Web server error: {}", e);
    }

    info!("image-tagger finished");

    Ok(())
}
