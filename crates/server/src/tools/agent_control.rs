//! agent_control tool implementation.
//!
//! Forwards a control message to the agent. Unknown shapes are not an
//! error; they come back as `ignored`.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waypoint_client::{Agent, ControlOutcome};

use super::json_result;

/// Parameters for the agent_control tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentControlParams {
    /// The message object, e.g. `{"type": "CONNECTION_CHANGE", "isSlowConnection": true}`
    /// or `{"type": "SKIP_WAITING"}`.
    pub message: serde_json::Value,
}

/// Output from the agent_control tool.
#[derive(Debug, Clone, Serialize)]
pub struct AgentControlOutput {
    pub accepted: bool,
    #[serde(flatten)]
    pub outcome: ControlOutcome,
}

/// Implementation of the agent_control tool.
pub async fn control_impl(agent: &Agent, params: AgentControlParams) -> Result<CallToolResult, McpError> {
    let outcome = agent.control().receive(&params.message);
    let output = AgentControlOutput { accepted: matches!(outcome, ControlOutcome::Applied(_)), outcome };
    json_result(&output)
}
