//! MCP tool implementations.
//!
//! Each tool takes its dependencies explicitly so it can be called from tests
//! without a transport.

pub mod cache;
pub mod geocode;
pub mod sw_fetch;
pub mod sw_message;
pub mod sw_status;

use crate::error::ToolError;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Wrap a serializable output as pretty JSON text content.
pub fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::Serialize(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
