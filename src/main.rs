use anyhow::{Context, Result};
use listing_sync::config::Config;
use listing_sync::scrapers::{build_feeds, HttpImageFetcher};
use listing_sync::store::{JsonFileStore, ListingStore, MemoryStore, RetryingStore};
use listing_sync::sync::{initialize_all, sync_all, SyncEngine};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Usage: `listing-sync [config.json] [sync|init]`
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = Config::resolve_path(args.next());
    let command = args.next().unwrap_or_else(|| "sync".to_string());

    info!("🏠 Listing sync ({}) using {}", command, config_path.display());

    let config = Config::load(&config_path)
        .await
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let policy = config.engine.store_retry;
    let store: Arc<dyn ListingStore> = match &config.store.path {
        Some(path) => {
            let store = JsonFileStore::open(path)
                .await
                .with_context(|| format!("Failed to open store at {}", path.display()))?;
            Arc::new(RetryingStore::new(store, policy))
        }
        None => Arc::new(RetryingStore::new(MemoryStore::new(), policy)),
    };

    let images = Arc::new(HttpImageFetcher::new().context("Failed to create image fetcher")?);
    let feeds = build_feeds(&config.sources).context("Failed to build source feeds")?;
    let engine = SyncEngine::new(store, images, config.engine.clone())?;

    let failed = match command.as_str() {
        "init" => {
            let results = initialize_all(&engine, &feeds).await;
            for (source, report) in results.iter().filter_map(|(s, r)| r.as_ref().ok().map(|r| (s, r))) {
                info!(
                    "✅ {}: {} inserted, {} skipped, {} failed",
                    source, report.inserted, report.skipped, report.failed
                );
            }
            results.iter().filter(|(_, r)| r.is_err()).count()
        }
        "sync" => {
            let results = sync_all(&engine, &feeds).await;
            for (source, stats) in results.iter().filter_map(|(s, r)| r.as_ref().ok().map(|r| (s, r))) {
                info!(
                    "✅ {}: {} added, {} updated, {} closed",
                    source, stats.added_count, stats.updated_count, stats.closed_count
                );
            }
            results.iter().filter(|(_, r)| r.is_err()).count()
        }
        other => anyhow::bail!("Unknown command {:?}, expected sync or init", other),
    };

    if failed > 0 {
        error!("{} of {} sources failed", failed, feeds.len());
        anyhow::bail!("{} of {} sources failed", failed, feeds.len());
    }

    Ok(())
}
