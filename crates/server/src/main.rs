//! mapcache server entry point.
//!
//! Loads configuration, opens the store, runs the worker lifecycle and then
//! serves MCP on stdio. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use anyhow::Result;
use mapcache_client::{GeocodeClient, HttpNetwork, Worker};
use mapcache_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod error;
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
    tracing::info!(version = %config.version, origin = %config.origin, db = %config.db_path.display(), "starting mapcache");

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(HttpNetwork::from_config(&config)?);
    let geocoder = GeocodeClient::from_config(&config)?;

    let worker = Arc::new(Worker::new(config, db, network)?);
    let state = worker.start().await?;
    tracing::info!(%state, "worker ready");

    let handler = handler::MapCacheServer::new(worker.clone(), geocoder);
    let server = serve_server(handler, stdio()).await?;
    server.waiting().await?;

    worker.settle().await;
    worker.context().db.clone().close().await?;
    Ok(())
}
