//! cache_sweep tool implementation.
//!
//! Runs one eviction sweep now instead of waiting for the next interval.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use waypoint_client::Agent;

use crate::tools::json_result;

/// Implementation of the cache_sweep tool.
pub async fn sweep_impl(agent: &Agent) -> Result<CallToolResult, McpError> {
    let report = agent.eviction().sweep().await?;
    json_result(&report)
}
