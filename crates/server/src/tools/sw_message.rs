//! sw_message tool implementation.

use super::json_result;
use mapcache_client::{ControlMessage, LifecycleState, Worker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message object as posted by a page, e.g. `{"type": "SKIP_WAITING"}`.
    pub message: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    pub state: LifecycleState,
}

pub async fn message_impl(worker: &Worker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let message = ControlMessage::parse(&params.message.to_string())?;
    let state = worker.handle_message(message).await?;
    json_result(&SwMessageOutput { state })
}
