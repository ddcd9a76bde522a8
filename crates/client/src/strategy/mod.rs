//! Retrieval strategies, one per category.
//!
//! | Category     | Strategy                          |
//! |--------------|-----------------------------------|
//! | `navigation` | network first, preload, start page |
//! | `static`     | cache first                       |
//! | `data`       | network first with timeout        |
//! | `tile-or-cdn`| stale-while-revalidate            |
//! | `other`      | network, scan every partition     |
//!
//! Strategies never fail: network and storage errors collapse into a
//! fallback or the synthesized `503 Offline`. Cache writes and trims run on
//! the worker's background task set and are never awaited here.

mod cache_first;
mod fallback;
mod navigation;
mod network_first;
mod stale_while_revalidate;

pub use cache_first::cache_first;
pub use fallback::network_or_scan;
pub use navigation::navigation;
pub use network_first::network_first;
pub use stale_while_revalidate::stale_while_revalidate;

use crate::worker::WorkerContext;
use mapcache_core::{Category, Partition, Request, RequestKey, Response};
use std::sync::Arc;

/// Dispatch a classified request to its strategy.
pub async fn respond(
    ctx: &Arc<WorkerContext>, category: Category, request: &Request, preload: Option<Response>,
) -> Response {
    match category {
        Category::Navigation => navigation(ctx, request, preload).await,
        Category::Static => cache_first(ctx, &ctx.static_partition, request).await,
        Category::Data => network_first(ctx, &ctx.data_partition, request, ctx.config.data_timeout()).await,
        Category::TileOrCdn => stale_while_revalidate(ctx, &ctx.tile_partition, request).await,
        Category::Other => network_or_scan(ctx, request).await,
    }
}

/// Read one entry; a storage failure counts as a miss.
pub(crate) async fn lookup(ctx: &WorkerContext, partition: &str, key: &RequestKey) -> Option<Response> {
    match ctx.db.get(partition, key).await {
        Ok(Some(entry)) => {
            tracing::debug!(partition, key = %key, "cache hit");
            Some(entry.response)
        }
        Ok(None) => {
            tracing::debug!(partition, key = %key, "cache miss");
            None
        }
        Err(e) => {
            tracing::warn!(partition, key = %key, "cache read failed, treating as miss: {e}");
            None
        }
    }
}

/// Store a copy of `response` and trim the partition, detached from the caller.
pub(crate) fn store_in_background(ctx: &WorkerContext, partition: &Partition, key: RequestKey, response: Response) {
    let db = ctx.db.clone();
    let partition = partition.clone();
    ctx.tasks.spawn("cache-write", async move {
        if let Err(e) = db.put(&partition, &key, &response).await {
            tracing::warn!(partition = %partition.name, key = %key, "cache write skipped: {e}");
            return;
        }
        if let Err(e) = db.trim(&partition.name, partition.max_entries).await {
            tracing::warn!(partition = %partition.name, "trim failed: {e}");
        }
    });
}
