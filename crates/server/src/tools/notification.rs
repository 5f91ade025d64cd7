//! push_receive, notification_click and notifications_recent tool implementations.

use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waypoint_client::{Agent, Notification, NotificationSink, View};

use super::json_result;
use crate::host::{RecordingSink, ReportedViews};

/// Parameters for the push_receive tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushReceiveParams {
    /// Raw push payload, shown verbatim. Omit for the default body.
    #[serde(default)]
    pub body: Option<String>,
}

/// One open application view.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ViewParam {
    pub id: String,
    /// Absolute URL, or a path on the application origin.
    pub url: String,
}

/// Parameters for the notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationClickParams {
    /// Views currently open in the host.
    #[serde(default)]
    pub views: Vec<ViewParam>,
}

/// Output of the notifications_recent tool.
#[derive(Debug, Clone, Serialize)]
pub struct RecentNotificationsOutput {
    /// Oldest first.
    pub notifications: Vec<Notification>,
}

/// Implementation of the push_receive tool.
pub async fn push_impl(
    agent: &Agent, sink: &dyn NotificationSink, params: PushReceiveParams,
) -> Result<CallToolResult, McpError> {
    let notification = agent.notifier().on_push(sink, params.body.as_deref()).await?;
    json_result(&notification)
}

/// Implementation of the notification_click tool.
pub async fn click_impl(agent: &Agent, params: NotificationClickParams) -> Result<CallToolResult, McpError> {
    let views = params
        .views
        .into_iter()
        .map(|v| View { id: v.id, url: v.url })
        .collect();
    let outcome = agent.notifier().on_click(&ReportedViews::new(views)).await?;
    json_result(&outcome)
}

/// Implementation of the notifications_recent tool.
pub fn recent_impl(sink: &RecordingSink) -> Result<CallToolResult, McpError> {
    json_result(&RecentNotificationsOutput { notifications: sink.recent() })
}
