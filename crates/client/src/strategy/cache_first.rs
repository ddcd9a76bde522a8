//! Cache-first strategy for same-origin static assets.

use super::{lookup, store_in_background};
use crate::fetch::CacheMode;
use crate::worker::WorkerContext;
use mapcache_core::{Partition, Request, Response, ResponseType};

/// Serve from `partition` when present; otherwise fetch and store.
///
/// Only successful same-origin (`basic`/`default`) responses are stored.
pub async fn cache_first(ctx: &WorkerContext, partition: &Partition, request: &Request) -> Response {
    let key = request.key();
    if let Some(cached) = lookup(ctx, &partition.name, &key).await {
        return cached;
    }

    match ctx.network.fetch(request, CacheMode::Default).await {
        Ok(response) => {
            if response.ok() && matches!(response.response_type, ResponseType::Basic | ResponseType::Default) {
                store_in_background(ctx, partition, key, response.clone());
            }
            response
        }
        Err(e) => {
            tracing::debug!(url = %request.url, "cache-first network failure: {e}");
            Response::offline()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use mapcache_core::AppConfig;

    #[tokio::test]
    async fn test_second_fetch_served_from_cache() {
        let (ctx, net) = context(AppConfig::default()).await;
        let url = format!("{ORIGIN}/app.js");
        net.respond(&url, Response::new(200, "console.log(1)"));

        let first = cache_first(&ctx, &ctx.static_partition, &get(&url)).await;
        ctx.tasks.settle().await;
        net.set_online(false);
        let second = cache_first(&ctx, &ctx.static_partition, &get(&url)).await;

        assert_eq!(first.status, 200);
        assert_eq!(second.body, b"console.log(1)");
        assert_eq!(net.calls_for(&url), 1);
    }

    #[tokio::test]
    async fn test_cors_response_not_stored() {
        let (ctx, net) = context(AppConfig::default()).await;
        let url = format!("{ORIGIN}/icons/icon-192.png");
        net.respond(&url, Response::new(200, "png").with_type(ResponseType::Cors));

        let res = cache_first(&ctx, &ctx.static_partition, &get(&url)).await;
        ctx.tasks.settle().await;

        assert_eq!(res.status, 200);
        assert_eq!(ctx.db.partition_len(&ctx.static_partition.name).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_error_status_returned_not_stored() {
        let (ctx, net) = context(AppConfig::default()).await;
        let url = format!("{ORIGIN}/missing.css");
        net.respond(&url, Response::new(404, "nope"));

        let res = cache_first(&ctx, &ctx.static_partition, &get(&url)).await;
        ctx.tasks.settle().await;

        assert_eq!(res.status, 404);
        assert_eq!(ctx.db.partition_len(&ctx.static_partition.name).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_miss_is_503() {
        let (ctx, net) = context(AppConfig::default()).await;
        net.set_online(false);
        let res = cache_first(&ctx, &ctx.static_partition, &get(&format!("{ORIGIN}/style.css"))).await;
        assert!(res.is_offline());
    }
}
