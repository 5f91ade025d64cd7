//! MCP tool implementations.
//!
//! This module contains all tools exposed by the waypoint server. Every tool
//! answers with one pretty-printed JSON text block.

pub mod agent_control;
pub mod agent_status;
pub mod cache;
pub mod notification;
pub mod resource_fetch;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub use agent_control::{AgentControlParams, control_impl};
pub use agent_status::status_impl;
pub use cache::sweep_impl;
pub use notification::{NotificationClickParams, PushReceiveParams, click_impl, push_impl, recent_impl};
pub use resource_fetch::{ResourceFetchParams, fetch_impl};

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::OutputFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
