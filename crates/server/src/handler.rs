//! MCP server handler implementation.
//!
//! Routes tool calls to the worker, the store and the geocoder.
use crate::tools::{
    cache::{CachePurgeParams, partitions_impl, purge_impl},
    geocode::{GeocodeParams, geocode_impl},
    sw_fetch::{SwFetchParams, fetch_impl},
    sw_message::{SwMessageParams, message_impl},
    sw_status::status_impl,
};

use mapcache_client::{GeocodeClient, Worker};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use std::sync::Arc;

/// The main MCP server handler for mapcache.
#[derive(Clone)]
pub struct MapCacheServer {
    worker: Arc<Worker>,
    geocoder: GeocodeClient,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl MapCacheServer {
    pub fn new(worker: Arc<Worker>, geocoder: GeocodeClient) -> Self {
        Self { worker, geocoder, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Intercept one request the way the offline worker would. Returns the response, its category, and whether it was served by the worker or passed through."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    #[tool(description = "Post a control message to the worker. Supports {\"type\": \"SKIP_WAITING\"}.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Report lifecycle state, deployed version and partitions.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    #[tool(description = "List cache partitions with entry counts and stored bytes.")]
    async fn cache_partitions(&self) -> Result<CallToolResult, McpError> {
        partitions_impl(&self.worker.context().db).await
    }

    #[tool(description = "Delete a cache partition, or trim it to its newest max_entries entries.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.worker.context().db, params.0).await
    }

    #[tool(
        description = "Look up a place name. Candidates are ranked with water features first and a bonus for proximity to an optional lat/lon origin."
    )]
    async fn geocode(&self, params: Parameters<GeocodeParams>) -> Result<CallToolResult, McpError> {
        geocode_impl(&self.geocoder, params.0).await
    }
}

impl ServerHandler for MapCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mapcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::active_worker;
    use mapcache_client::GeocodeConfig;

    #[tokio::test]
    async fn test_all_tools_registered() {
        let (worker, _net) = active_worker().await;
        let server = MapCacheServer::new(worker, GeocodeClient::new(GeocodeConfig::default()).unwrap());

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["cache_partitions", "cache_purge", "geocode", "sw_fetch", "sw_message", "sw_status"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let (worker, _net) = active_worker().await;
        let server = MapCacheServer::new(worker, GeocodeClient::new(GeocodeConfig::default()).unwrap());
        assert_eq!(server.get_info().server_info.name, "mapcache");
    }
}
