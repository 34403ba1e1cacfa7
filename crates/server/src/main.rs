//! vidcache server entry point.
//!
//! Boots the offline cache engine and serves it as an MCP server on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use vidcache_client::{FetchClient, FetchConfig};
use vidcache_core::{AppConfig, CacheStorage};
use vidcache_server::{Engine, EngineConfig, HOST_CLIENT, VidcacheServer};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.version, db = %config.db_path.display(), "starting vidcache on stdio transport");

    let storage = CacheStorage::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig {
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        max_redirects: config.max_redirects,
    })?;

    let engine = Arc::new(Engine::new(EngineConfig::from_app_config(&config)?, storage, Arc::new(network)));
    engine.register_client(HOST_CLIENT).await;

    if let Err(e) = engine.start().await {
        tracing::error!(error = %e, "engine did not activate; commands will be refused");
    }

    let server = serve_server(VidcacheServer::new(engine.clone()), stdio()).await?;
    server.waiting().await?;

    engine.unregister_client(HOST_CLIENT).await;

    engine.shutdown().await;
    Ok(())
}
