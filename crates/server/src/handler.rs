//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the agent.
use std::sync::Arc;

use crate::host::RecordingSink;
use crate::tools::{
    AgentControlParams, NotificationClickParams, PushReceiveParams, ResourceFetchParams, click_impl, control_impl,
    fetch_impl, push_impl, recent_impl, status_impl, sweep_impl,
};

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
use waypoint_client::Agent;

/// The main MCP server handler for waypoint.
#[derive(Clone)]
pub struct WaypointServer {
    tool_router: ToolRouter<Self>,
    agent: Arc<Agent>,
    sink: Arc<RecordingSink>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WaypointServer {
    /// Create a new server handler around a running agent.
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { tool_router: Self::tool_router(), agent, sink: Arc::new(RecordingSink::default()) }
    }

    #[tool(
        description = "Issue a request through the caching agent. The request is classified and served by its caching strategy (network-first for documents, cache-first for fonts and images, stale-while-revalidate for bundles, styles and scripts); unclassified requests pass through."
    )]
    async fn resource_fetch(&self, params: Parameters<ResourceFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.agent, params.0).await
    }

    #[tool(
        description = "Send a control message: {\"type\":\"CONNECTION_CHANGE\",\"isSlowConnection\":bool} or {\"type\":\"SKIP_WAITING\"}. Unknown messages are ignored."
    )]
    async fn agent_control(&self, params: Parameters<AgentControlParams>) -> Result<CallToolResult, McpError> {
        control_impl(&self.agent, params.0).await
    }

    #[tool(description = "Deliver a push payload. Returns the notification to display.")]
    async fn push_receive(&self, params: Parameters<PushReceiveParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.agent, self.sink.as_ref(), params.0).await
    }

    #[tool(
        description = "Route a notification click. Given the open views, returns which view to focus or the root URL to open."
    )]
    async fn notification_click(
        &self, params: Parameters<NotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        click_impl(&self.agent, params.0).await
    }

    #[tool(description = "List the most recent notifications shown, oldest first.")]
    async fn notifications_recent(&self) -> Result<CallToolResult, McpError> {
        recent_impl(&self.sink)
    }

    #[tool(description = "Run an eviction sweep over the agent's partitions now.")]
    async fn cache_sweep(&self) -> Result<CallToolResult, McpError> {
        sweep_impl(&self.agent).await
    }

    #[tool(description = "Report lifecycle state, connection quality and cache partitions.")]
    async fn agent_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.agent).await
    }
}

impl ServerHandler for WaypointServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "waypoint".into(),
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
    use crate::tools::testing::agent;

    #[tokio::test]
    async fn test_all_tools_registered() {
        let (agent, _db) = agent().await;
        let server = WaypointServer::new(agent);

        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "agent_control",
                "agent_status",
                "cache_sweep",
                "notification_click",
                "notifications_recent",
                "push_receive",
                "resource_fetch",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let (agent, _db) = agent().await;
        let info = WaypointServer::new(agent).get_info();
        assert_eq!(info.server_info.name, "waypoint");
    }
}
