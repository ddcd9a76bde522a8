//! Network with a scan of every partition, for uncategorized requests.

use crate::fetch::CacheMode;
use crate::worker::WorkerContext;
use mapcache_core::{Request, Response};

/// Uncategorized requests: network, then any partition holding the key.
pub async fn network_or_scan(ctx: &WorkerContext, request: &Request) -> Response {
    let e = match ctx.network.fetch(request, CacheMode::Default).await {
        Ok(response) => return response,
        Err(e) => e,
    };

    let key = request.key();
    match ctx.db.match_any(&key).await {
        Ok(Some(entry)) => {
            tracing::debug!(key = %key, "network failed ({e}), served from scan");
            entry.response
        }
        Ok(None) => Response::offline(),
        Err(scan) => {
            tracing::warn!(key = %key, "partition scan failed: {scan}");
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
    async fn test_network_passes_through() {
        let (ctx, net) = context(AppConfig::default()).await;
        let url = "https://nominatim.openstreetmap.org/search?q=lake";
        net.respond(url, Response::new(200, "[]"));
        assert_eq!(network_or_scan(&ctx, &get(url)).await.body, b"[]");
    }

    #[tokio::test]
    async fn test_offline_scans_all_partitions() {
        let (ctx, net) = context(AppConfig::default()).await;
        let url = format!("{ORIGIN}/vendor/leaflet.css");
        ctx.db.put(&ctx.tile_partition, &get(&url).key(), &Response::new(200, "leaflet")).await.unwrap();

        net.set_online(false);
        assert_eq!(network_or_scan(&ctx, &get(&url)).await.body, b"leaflet");
    }

    #[tokio::test]
    async fn test_offline_no_match_is_503() {
        let (ctx, net) = context(AppConfig::default()).await;
        net.set_online(false);
        assert!(network_or_scan(&ctx, &get("https://example.com/x")).await.is_offline());
    }
}
