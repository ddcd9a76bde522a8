//! Page navigations: preload, network, then the cached start page.

use super::lookup;
use crate::fetch::CacheMode;
use crate::worker::WorkerContext;
use mapcache_core::{Request, RequestKey, Response};

/// Page loads: preload, then network, then the cached start page.
///
/// Navigation responses are never stored; offline loads always land on the
/// precached start page regardless of the URL requested.
pub async fn navigation(ctx: &WorkerContext, request: &Request, preload: Option<Response>) -> Response {
    if let Some(preloaded) = preload {
        tracing::debug!(url = %request.url, "using navigation preload");
        return preloaded;
    }

    match ctx.network.fetch(request, CacheMode::Default).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url = %request.url, "navigation offline, serving start page: {e}");
            let key = RequestKey::new("GET", &ctx.start_page);
            lookup(ctx, &ctx.static_partition.name, &key).await.unwrap_or_else(Response::offline)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use mapcache_core::AppConfig;

    fn navigate(url: &str) -> Request {
        Request::navigate(url::Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_preload_skips_network() {
        let (ctx, net) = context(AppConfig::default()).await;
        let url = format!("{ORIGIN}/");
        let res = navigation(&ctx, &navigate(&url), Some(Response::new(200, "preloaded"))).await;
        assert_eq!(res.body, b"preloaded");
        assert_eq!(net.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_online_uses_network() {
        let (ctx, net) = context(AppConfig::default()).await;
        let url = format!("{ORIGIN}/?lat=1&lon=2");
        net.respond(&url, Response::new(200, "<html>live</html>"));
        let res = navigation(&ctx, &navigate(&url), None).await;
        assert_eq!(res.body, b"<html>live</html>");
    }

    #[tokio::test]
    async fn test_offline_serves_cached_start_page() {
        let (ctx, net) = context(AppConfig::default()).await;
        let start = Request::get(ctx.start_page.clone());
        ctx.db.put(&ctx.static_partition, &start.key(), &Response::new(200, "<html>shell</html>")).await.unwrap();

        net.set_online(false);
        let res = navigation(&ctx, &navigate(&format!("{ORIGIN}/some/deep/link")), None).await;
        assert_eq!(res.body, b"<html>shell</html>");
    }

    #[tokio::test]
    async fn test_offline_without_start_page_is_503() {
        let (ctx, net) = context(AppConfig::default()).await;
        net.set_online(false);
        let res = navigation(&ctx, &navigate(&format!("{ORIGIN}/")), None).await;
        assert!(res.is_offline());
    }
}
