//! Errors raised by the tool layer itself.
//!
//! Worker, store and geocoder failures arrive as `mapcache_core::Error` and
//! convert directly; these cover argument shape and output encoding.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments are well-typed but inconsistent (e.g., latitude without longitude).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("SERIALIZE_FAILED: {0}")]
    Serialize(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::Serialize(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err: McpError = ToolError::InvalidInput("lat without lon".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert_eq!(err.message, "lat without lon");

        let err: McpError = ToolError::Serialize("nan".into()).into();
        assert_eq!(err.code, ErrorCode(-32603));
    }
}
