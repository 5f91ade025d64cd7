//! resource_fetch tool implementation.
//!
//! Runs one request through the agent exactly as an intercepted application
//! request would be: classified, served by its strategy, or passed through.

use std::collections::BTreeMap;

use reqwest::Method;
use reqwest::header::{HeaderName, HeaderValue};
use rmcp::ErrorData as McpError;
use rmcp::model::CallToolResult;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waypoint_client::{Agent, ResourceRequest, ResponseSource};
use waypoint_core::ResourceClass;

use super::json_result;
use crate::error::ToolError;

/// Input parameters for resource_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResourceFetchParams {
    /// Target URL, absolute or relative to the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body, sent as UTF-8.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for resource_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceFetchOutput {
    pub url: String,
    pub class: ResourceClass,
    pub source: ResponseSource,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub body_bytes: usize,
}

fn build_request(agent: &Agent, params: ResourceFetchParams) -> Result<ResourceRequest, McpError> {
    let url = agent.resolve(&params.url)?;
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|e| ToolError::InvalidInput(format!("method {}: {e}", params.method)))?;

    let mut request = ResourceRequest::new(method, url);
    for (name, value) in &params.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ToolError::InvalidInput(format!("header {name}: {e}")))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| ToolError::InvalidInput(format!("header {name}: {e}")))?;
        request = request.with_header(name, value);
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }
    Ok(request)
}

/// Implementation of the resource_fetch tool.
pub async fn fetch_impl(agent: &Agent, params: ResourceFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(agent, params)?;
    // Nothing is classified until the agent is active.
    let class = if agent.lifecycle().is_active() {
        agent.dispatcher().classify(&request)
    } else {
        ResourceClass::Unclassified
    };
    let response = agent.handle(&request).await?;

    let headers = response
        .headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
        .collect();

    let output = ResourceFetchOutput {
        url: request.url.to_string(),
        class,
        source: response.source,
        status: response.status.as_u16(),
        headers,
        body: String::from_utf8_lossy(&response.body).into_owned(),
        body_bytes: response.body.len(),
    };

    json_result(&output)
}
