//! sw_fetch tool implementation.
//!
//! Runs one request through the worker exactly as a page fetch would be
//! intercepted. Requests the worker declines are sent to the network
//! unmodified.

use super::json_result;
use mapcache_client::fetch::canonicalize;
use mapcache_client::{CacheMode, FetchEvent, Interception, Worker};
use mapcache_core::{Error, Request, RequestMode, Response};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path relative to the app origin (e.g. `/OTN.geojson`).
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode; `navigate` marks a page load.
    #[serde(default)]
    pub mode: RequestMode,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body, forwarded on passthrough.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// Whether the worker answered (false: forwarded untouched).
    pub intercepted: bool,
    /// Category the request was classified into, when intercepted.
    pub category: Option<String>,
    pub status: u16,
    pub status_text: String,
    pub response_type: String,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossy.
    pub body: String,
    pub body_len: usize,
}

impl SwFetchOutput {
    fn new(intercepted: bool, category: Option<String>, response: Response) -> Self {
        Self {
            intercepted,
            category,
            status: response.status,
            status_text: response.status_text,
            response_type: response.response_type.as_str().to_string(),
            body: String::from_utf8_lossy(&response.body).into_owned(),
            body_len: response.body.len(),
            headers: response.headers,
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &Worker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let ctx = worker.context();
    let url = canonicalize(&params.url, &ctx.config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let request = Request {
        method: params.method.trim().to_ascii_uppercase(),
        url,
        mode: params.mode,
        headers: params.headers.into_iter().collect(),
        body: params.body.map(String::into_bytes).unwrap_or_default(),
    };

    let output = match worker.handle_fetch(FetchEvent::new(request.clone())).await {
        Interception::Respond { category, response } => {
            SwFetchOutput::new(true, Some(category.as_str().to_string()), response)
        }
        Interception::Passthrough => {
            tracing::debug!(url = %request.url, method = %request.method, "passthrough");
            let response = ctx.network.fetch(&request, CacheMode::Default).await?;
            SwFetchOutput::new(false, None, response)
        }
    };

    json_result(&output)
}
