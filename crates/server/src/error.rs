//! Errors raised by the tool layer itself.
//!
//! Agent failures arrive as `waypoint_core::Error` and convert directly;
//! these cover parameter parsing and output encoding.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A parameter could not be turned into a request.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Tool output could not be encoded.
    #[error("OUTPUT_FAILED: {0}")]
    OutputFailed(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::OutputFailed(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_code() {
        let err: McpError = ToolError::InvalidInput("bad method".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));
        assert_eq!(err.message, "bad method");
    }

    #[test]
    fn test_display_prefix() {
        assert_eq!(ToolError::OutputFailed("x".into()).to_string(), "OUTPUT_FAILED: x");
    }
}
