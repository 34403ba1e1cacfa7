//! Video command tools.
//!
//! Each tool sends one command over the engine's command channel on behalf
//! of the host client and returns the reply payload unchanged.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use vidcache_core::Error;

use crate::command::{Command, Reply};
use crate::engine::Engine;
use crate::handler::HOST_CLIENT;

/// Parameters for tools that target one video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoParams {
    /// Video URL, absolute or relative to the configured origin.
    pub url: String,
}

/// Parameters for the post_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PostMessageParams {
    /// Raw command message, e.g. `{"action": "CHECK_VIDEO_STATUS", "videoUrl": "/videos/a.mp4"}`.
    pub message: serde_json::Value,
}

fn reply_result(reply: &Reply) -> Result<CallToolResult, McpError> {
    let json =
        serde_json::to_string_pretty(reply).map_err(|e| Error::InvalidInput(format!("Failed to serialize reply: {e}")))?;
    let failed = reply.to_json().get("success") == Some(&serde_json::Value::Bool(false));

    if failed {
        Ok(CallToolResult::error(vec![Content::text(json)]))
    } else {
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

/// Run a typed command for the host client.
pub async fn command_impl(engine: &Engine, command: Command) -> Result<CallToolResult, McpError> {
    let reply = engine.execute(HOST_CLIENT, command).await?;
    reply_result(&reply)
}

/// Implementation of the post_message tool.
pub async fn post_message_impl(engine: &Engine, params: PostMessageParams) -> Result<CallToolResult, McpError> {
    let reply = engine.post_message(HOST_CLIENT, params.message).await?;
    reply_result(&reply)
}
