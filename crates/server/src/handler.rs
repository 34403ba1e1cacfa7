//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to the
//! engine. The MCP peer acts as the single foreground client.
use std::sync::Arc;

use crate::command::Command;
use crate::engine::Engine;
use crate::tools::{FetchResourceParams, PostMessageParams, VideoParams, command_impl, fetch_impl, post_message_impl};

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

/// Client id the MCP peer is registered under.
pub const HOST_CLIENT: &str = "mcp-host";

/// The main MCP server handler for vidcache.
#[derive(Clone)]
pub struct VidcacheServer {
    engine: Arc<Engine>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl VidcacheServer {
    /// Create a new server handler over a running engine.
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Request a resource through the offline cache. Media is served from the video store, everything else from the app shell, falling back to offline responses when the network is down."
    )]
    async fn fetch_resource(&self, params: Parameters<FetchResourceParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, params.0).await
    }

    #[tool(description = "Download a video for offline playback. Only complete (200) responses are stored.")]
    async fn download_video(&self, params: Parameters<VideoParams>) -> Result<CallToolResult, McpError> {
        command_impl(&self.engine, Command::DownloadVideo { video_url: params.0.url }).await
    }

    #[tool(description = "List the URLs of every downloaded video.")]
    async fn list_downloaded_videos(&self) -> Result<CallToolResult, McpError> {
        command_impl(&self.engine, Command::GetDownloadedVideos).await
    }

    #[tool(description = "Delete one downloaded video. Deleting a missing video succeeds.")]
    async fn delete_video(&self, params: Parameters<VideoParams>) -> Result<CallToolResult, McpError> {
        command_impl(&self.engine, Command::DeleteVideo { video_url: params.0.url }).await
    }

    #[tool(description = "Delete every downloaded video.")]
    async fn clear_all_videos(&self) -> Result<CallToolResult, McpError> {
        command_impl(&self.engine, Command::ClearAllVideos).await
    }

    #[tool(description = "Check whether a video is available offline.")]
    async fn check_video_status(&self, params: Parameters<VideoParams>) -> Result<CallToolResult, McpError> {
        command_impl(&self.engine, Command::CheckVideoStatus { video_url: params.0.url }).await
    }

    #[tool(description = "Report the number of downloaded videos and bytes stored.")]
    async fn storage_usage(&self) -> Result<CallToolResult, McpError> {
        command_impl(&self.engine, Command::GetStorageUsage).await
    }

    #[tool(
        description = "Post a raw command message ({\"action\": ..., \"videoUrl\": ...}) and return its reply."
    )]
    async fn post_message(&self, params: Parameters<PostMessageParams>) -> Result<CallToolResult, McpError> {
        post_message_impl(&self.engine, params.0).await
    }
}

impl ServerHandler for VidcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "vidcache".into(),
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
    use crate::testing::{StubNetwork, started_engine};

    #[tokio::test]
    async fn test_every_tool_is_listed() {
        let server = VidcacheServer::new(started_engine(StubNetwork::new()).await);
        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "check_video_status",
                "clear_all_videos",
                "delete_video",
                "download_video",
                "fetch_resource",
                "list_downloaded_videos",
                "post_message",
                "storage_usage",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let server = VidcacheServer::new(started_engine(StubNetwork::new()).await);
        assert_eq!(server.get_info().server_info.name, "vidcache");
    }
}
