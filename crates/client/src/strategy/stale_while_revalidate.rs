//! Stale-while-revalidate for map tiles and CDN assets.

use super::{lookup, store_in_background};
use crate::fetch::CacheMode;
use crate::worker::WorkerContext;
use mapcache_core::{Partition, Request, Response};
use std::sync::Arc;

/// Serve the stored copy immediately and refresh it in the background.
///
/// On a miss the caller waits for the network. Revalidation always bypasses
/// intermediate HTTP caches.
pub async fn stale_while_revalidate(ctx: &Arc<WorkerContext>, partition: &Partition, request: &Request) -> Response {
    let key = request.key();

    if let Some(cached) = lookup(ctx, &partition.name, &key).await {
        let tasks = ctx.tasks.clone();
        let ctx = Arc::clone(ctx);
        let partition = partition.clone();
        let request = request.clone();
        tasks.spawn("revalidate", async move {
            match ctx.network.fetch(&request, CacheMode::NoStore).await {
                Ok(fresh) if fresh.ok() || fresh.is_opaque() => {
                    store_in_background(&ctx, &partition, request.key(), fresh);
                }
                Ok(fresh) => tracing::debug!(url = %request.url, status = fresh.status, "revalidation not stored"),
                Err(e) => tracing::debug!(url = %request.url, "revalidation failed: {e}"),
            }
        });
        return cached;
    }

    match ctx.network.fetch(request, CacheMode::NoStore).await {
        Ok(response) => {
            if response.ok() || response.is_opaque() {
                store_in_background(ctx, partition, key, response.clone());
            }
            response
        }
        Err(e) => {
            tracing::debug!(url = %request.url, "stale-while-revalidate miss and network failure: {e}");
            Response::offline()
        }
    }
}
