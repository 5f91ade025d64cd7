//! agent_status tool implementation.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use waypoint_client::Agent;

use super::json_result;

/// Lifecycle state, connection flag and partitions.
pub async fn status_impl(agent: &Agent) -> Result<CallToolResult, McpError> {
    let status = agent.status().await?;
    json_result(&status)
}
