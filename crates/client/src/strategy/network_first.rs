//! Network-first strategy for datasets, bounded by a timeout.

use super::{lookup, store_in_background};
use crate::fetch::CacheMode;
use crate::worker::WorkerContext;
use mapcache_core::{Partition, Request, Response};
use std::time::Duration;

/// Try the network within `timeout`, falling back to the last stored copy.
///
/// The fetch future is dropped when the timeout fires, which aborts the
/// underlying request. Non-2xx responses reach the caller but are not stored.
pub async fn network_first(ctx: &WorkerContext, partition: &Partition, request: &Request, timeout: Duration) -> Response {
    let key = request.key();

    let failure = match tokio::time::timeout(timeout, ctx.network.fetch(request, CacheMode::Default)).await {
        Ok(Ok(response)) => {
            if response.ok() || response.is_opaque() {
                store_in_background(ctx, partition, key, response.clone());
            }
            return response;
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("no response within {}ms", timeout.as_millis()),
    };

    tracing::debug!(url = %request.url, "network-first falling back to cache: {failure}");
    lookup(ctx, &partition.name, &key).await.unwrap_or_else(Response::offline)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use mapcache_core::{AppConfig, ResponseType};

    const TIMEOUT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_fresh_response_is_stored() {
        let (ctx, net) = context(AppConfig::default()).await;
        let url = format!("{ORIGIN}/OTN.geojson");
        net.respond(&url, Response::new(200, r#"{"type":"FeatureCollection"}"#));

        let res = network_first(&ctx, &ctx.data_partition, &get(&url), TIMEOUT).await;
        ctx.tasks.settle().await;

        assert_eq!(res.status, 200);
        let stored = ctx.db.get(&ctx.data_partition.name, &get(&url).key()).await.unwrap().unwrap();
        assert_eq!(stored.response.body, res.body);
    }

    #[tokio::test]
    async fn test_network_always_preferred_when_up() {
        let (ctx, net) = context(AppConfig::default()).await;
        let url = format!("{ORIGIN}/OTN.geojson");
        net.respond(&url, Response::new(200, "v1"));
        network_first(&ctx, &ctx.data_partition, &get(&url), TIMEOUT).await;
        ctx.tasks.settle().await;

        net.respond(&url, Response::new(200, "v2"));
        let res = network_first(&ctx, &ctx.data_partition, &get(&url), TIMEOUT).await;
        assert_eq!(res.body, b"v2");
        assert_eq!(net.calls_for(&url), 2);
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_cache() {
        let (ctx, net) = context(AppConfig::default()).await;
        let url = format!("{ORIGIN}/OTN.geojson");
        net.respond(&url, Response::new(200, "cached"));
        network_first(&ctx, &ctx.data_partition, &get(&url), TIMEOUT).await;
        ctx.tasks.settle().await;

        net.delay(&url, Duration::from_secs(5), Response::new(200, "late"));
        let res = network_first(&ctx, &ctx.data_partition, &get(&url), TIMEOUT).await;
        assert_eq!(res.body, b"cached");
    }

    #[tokio::test]
    async fn test_opaque_is_stored() {
        let (ctx, net) = context(AppConfig::default()).await;
        let url = format!("{ORIGIN}/trails.geojson");
        net.respond(&url, Response::new(0, Vec::new()).with_type(ResponseType::Opaque));

        network_first(&ctx, &ctx.data_partition, &get(&url), TIMEOUT).await;
        ctx.tasks.settle().await;
        assert_eq!(ctx.db.partition_len(&ctx.data_partition.name).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_server_error_not_stored_but_returned() {
        let (ctx, net) = context(AppConfig::default()).await;
        let url = format!("{ORIGIN}/OTN.geojson");
        net.respond(&url, Response::new(500, "boom"));

        let res = network_first(&ctx, &ctx.data_partition, &get(&url), TIMEOUT).await;
        ctx.tasks.settle().await;
        assert_eq!(res.status, 500);
        assert_eq!(ctx.db.partition_len(&ctx.data_partition.name).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_offline_without_cache_is_503() {
        let (ctx, net) = context(AppConfig::default()).await;
        net.set_online(false);
        let res = network_first(&ctx, &ctx.data_partition, &get(&format!("{ORIGIN}/OTN.geojson")), TIMEOUT).await;
        assert!(res.is_offline());
    }
}
