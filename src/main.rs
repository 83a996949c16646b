mod cli;
mod scheduler;
mod snapshot;

use std::collections::HashMap;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use crawler_core::config::AppConfig;
use crawler_core::CanonicalUrl;
use crawler_extract::Extractor;
use crawler_fetch::{Fetcher, FetcherConfig};
use crawler_frontier::Frontier;
use crawler_robots::RobotsCache;
use crawler_store::Storage;

use crate::cli::{Cli, Commands};
use crate::scheduler::Scheduler;
use crate::snapshot::Snapshot;

const DEFAULT_SEED: &str = "https://en.wikipedia.org/";

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(Some(&cli.config))?;

    match cli.command {
        Commands::Run { seed } => run(config, seed).await,
        Commands::Status => status(config).await,
    }
}

async fn run(config: AppConfig, seed: Option<String>) -> Result<()> {
    let fetcher_config = FetcherConfig {
        connect_timeout: std::time::Duration::from_millis(config.fetch.connect_timeout_ms),
        read_timeout: std::time::Duration::from_millis(config.fetch.read_timeout_ms),
        write_timeout: std::time::Duration::from_millis(config.fetch.write_timeout_ms),
        max_redirects: config.fetch.max_redirects,
    };
    let fetcher = Fetcher::new(&fetcher_config)?;
    let extractor = Extractor::new(&config.language_id.model_path)?;
    let store = Storage::new(&config.database.path).await?;

    let (frontier, robots, cooldowns) = match Snapshot::load(&config.general.snapshot_path)? {
        Some(snapshot) => {
            info!(path = %config.general.snapshot_path, "resuming from snapshot");
            (
                Frontier::from_snapshot(snapshot.frontier),
                RobotsCache::from_snapshot(config.robots.user_agent.clone(), snapshot.robots),
                snapshot.cooldowns,
            )
        }
        None => {
            info!("no snapshot found, starting fresh");
            let frontier = Frontier::new();
            seed_frontier(&frontier, &store, seed.as_deref()).await?;
            (frontier, RobotsCache::new(config.robots.user_agent.clone()), HashMap::new())
        }
    };

    let scheduler = Scheduler::new(frontier, robots, cooldowns, fetcher, extractor, store, config.general.max_inflight);

    let stop = scheduler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, finishing in-flight fetches");
            stop.store(true, std::sync::atomic::Ordering::Relaxed);
        }
    });

    scheduler.run().await;

    let snapshot = scheduler.snapshot();
    snapshot.save(&config.general.snapshot_path)?;
    info!(path = %config.general.snapshot_path, "snapshot written");

    Ok(())
}

/// Seeds the frontier for a fresh run: an explicit `--seed` URL if given,
/// else the links harvested by re-parsing every already-stored document
/// (`spec.md` §6 — the frontier is reconstructed by re-extracting links
/// from every stored document, not by re-enqueuing the documents' own
/// URLs, which are already in the store and would be skipped outright),
/// else the default seed if the store is empty.
async fn seed_frontier(frontier: &Frontier, store: &Storage, seed: Option<&str>) -> Result<()> {
    if let Some(seed) = seed {
        let url = CanonicalUrl::parse(seed)?;
        frontier.insert(url);
        return Ok(());
    }

    let documents = store.all_documents().await?;
    if documents.is_empty() {
        frontier.insert(CanonicalUrl::parse(DEFAULT_SEED)?);
        return Ok(());
    }

    for (url, content) in documents {
        let base_url = match CanonicalUrl::parse(&url) {
            Ok(url) => url,
            Err(err) => {
                warn!(url, error = %err, "dropping unparseable stored url while reseeding");
                continue;
            }
        };
        for link in crawler_extract::harvest_links(&base_url, &content) {
            frontier.insert(link.url);
        }
    }
    Ok(())
}

async fn status(config: AppConfig) -> Result<()> {
    let store = Storage::new(&config.database.path).await?;
    let count = store.count().await?;
    println!("documents stored: {count}");
    Ok(())
}
