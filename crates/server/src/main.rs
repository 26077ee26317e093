//! storefront-mcp server entry point.
//!
//! Boots the catalog cache, the change channel and the MCP server on stdio
//! transport. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use storefront_client::{CatalogStore, FetcherConfig, RemoteFetcher, StaticToken};
use storefront_core::{
    AppConfig, CacheDb, CatalogCache, ChangeBroadcaster, ChangeChannel, EntityType, MemoryChannel, RefreshBinder,
    SqliteChannel,
};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        api = %config.api_base_url,
        persistence = config.persistence_enabled(),
        "Starting storefront-mcp server on stdio transport"
    );

    let (cache, channel) = match &config.db_path {
        Some(path) => {
            let db = CacheDb::open(path).await?;
            let channel: Arc<dyn ChangeChannel> =
                Arc::new(SqliteChannel::start(db.clone(), config.channel_poll_interval()).await?);
            (Arc::new(CatalogCache::with_persistence(config.cache_ttl(), db)), channel)
        }
        None => {
            let channel: Arc<dyn ChangeChannel> = Arc::new(MemoryChannel::new());
            (Arc::new(CatalogCache::new(config.cache_ttl())), channel)
        }
    };

    let broadcaster = Arc::new(ChangeBroadcaster::new(cache.clone(), channel));
    let _listener = broadcaster.clone().listen();

    let tokens = Arc::new(config.auth_token.clone().map(StaticToken::new).unwrap_or_default());
    let fetcher = RemoteFetcher::new(FetcherConfig::from(&config), tokens)?;
    let store = CatalogStore::new(fetcher, cache);

    let binder = RefreshBinder::new(config.refresh_delay());
    for entity in EntityType::ALL {
        let store = store.clone();
        binder
            .on_data_updated(entity, move |entity| {
                let store = store.clone();
                tokio::spawn(async move {
                    let count = store.warm(entity).await;
                    tracing::debug!("rewarmed {} cache with {} entries", entity, count);
                });
            })
            .await;
    }
    let _refresher = binder.spawn(broadcaster.subscribe_updates());

    let handler = handler::CatalogServer::new(store, broadcaster);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
