//! fetch_resource tool implementation.
//!
//! Hands one outbound request to the interceptor and reports the response.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vidcache_core::Error;

use crate::engine::Engine;
use crate::response::{Destination, Request, ResponseSource};

/// Parameters for the fetch_resource tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchResourceParams {
    /// Absolute URL, or a path relative to the configured origin.
    pub url: String,

    /// What the caller will do with the response (default: "other").
    #[serde(default)]
    pub destination: Destination,
}

/// Output from the fetch_resource tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchResourceOutput {
    /// Canonical identifier the request resolved to.
    pub url: String,
    pub status: u16,
    pub source: ResponseSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body_len: usize,
    /// Body as text when it is valid UTF-8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Implementation of the fetch_resource tool.
pub async fn fetch_impl(engine: &Engine, params: FetchResourceParams) -> Result<CallToolResult, McpError> {
    let id = engine.resolve(&params.url)?;
    let response = engine.fetch(&Request::new(id.clone(), params.destination)).await;

    let output = FetchResourceOutput {
        url: id.to_string(),
        status: response.status,
        source: response.source,
        content_type: response.header("content-type").map(str::to_string),
        body_len: response.body.len(),
        body: std::str::from_utf8(&response.body).ok().map(str::to_string),
        headers: response.headers,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize response: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubNetwork, started_engine, tool_json};
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_shell_resource_offline() {
        let engine = started_engine(StubNetwork::new()).await;

        let params = FetchResourceParams { url: "./index.html".into(), destination: Destination::Document };
        let output = tool_json(&fetch_impl(&engine, params).await.unwrap());
        assert_eq!(output["source"], json!("app_shell"));
        assert_eq!(output["status"], json!(200));
        assert_eq!(output["body"], json!("<html>index"));
    }

    #[tokio::test]
    async fn test_fetch_missing_video_offline() {
        let engine = started_engine(StubNetwork::new()).await;

        let params = FetchResourceParams { url: "/videos/none.mp4".into(), destination: Destination::Other };
        let output = tool_json(&fetch_impl(&engine, params).await.unwrap());
        assert_eq!(output["source"], json!("offline"));
        assert_eq!(output["content_type"], json!("application/json"));
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let engine = started_engine(StubNetwork::new()).await;

        let params = FetchResourceParams { url: "mailto:someone@example.com".into(), destination: Destination::Other };
        let err = fetch_impl(&engine, params).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }
}
