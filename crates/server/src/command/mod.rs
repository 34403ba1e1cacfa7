//! Foreground command protocol.
//!
//! Wire messages are JSON objects with an `action` tag and action-specific
//! fields (`videoUrl`). Every accepted message gets exactly one reply on its
//! own reply channel.

pub mod channel;
pub mod exec;

pub use channel::{CommandChannel, Dispatcher, Envelope};
pub use exec::CommandExecutor;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vidcache_core::Error;

/// Action tags understood by the engine.
pub const ACTIONS: [&str; 6] = [
    "DOWNLOAD_VIDEO",
    "GET_DOWNLOADED_VIDEOS",
    "DELETE_VIDEO",
    "CLEAR_ALL_VIDEOS",
    "CHECK_VIDEO_STATUS",
    "GET_STORAGE_USAGE",
];

/// A typed foreground command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Fetch a video and persist it if the response is complete.
    DownloadVideo {
        #[serde(rename = "videoUrl")]
        video_url: String,
    },
    GetDownloadedVideos,
    DeleteVideo {
        #[serde(rename = "videoUrl")]
        video_url: String,
    },
    /// Replace the Media Store with an empty one.
    ClearAllVideos,
    CheckVideoStatus {
        #[serde(rename = "videoUrl")]
        video_url: String,
    },
    GetStorageUsage,
}

impl Command {
    /// Validate a raw wire message.
    ///
    /// A missing or non-string `action` is `InvalidInput`; an action outside
    /// the protocol is `UnknownAction`.
    pub fn from_message(message: Value) -> Result<Self, Error> {
        let action = message
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidInput("message has no action".into()))?;

        if !ACTIONS.contains(&action) {
            return Err(Error::UnknownAction(action.to_string()));
        }

        serde_json::from_value(message).map_err(|e| Error::InvalidInput(e.to_string()))
    }

    pub fn action(&self) -> &'static str {
        match self {
            Command::DownloadVideo { .. } => "DOWNLOAD_VIDEO",
            Command::GetDownloadedVideos => "GET_DOWNLOADED_VIDEOS",
            Command::DeleteVideo { .. } => "DELETE_VIDEO",
            Command::ClearAllVideos => "CLEAR_ALL_VIDEOS",
            Command::CheckVideoStatus { .. } => "CHECK_VIDEO_STATUS",
            Command::GetStorageUsage => "GET_STORAGE_USAGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadReply {
    pub success: bool,
    pub video_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideosReply {
    pub videos: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeleteReply {
    pub success: bool,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClearReply {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusReply {
    pub is_cached: bool,
    pub video_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageReply {
    pub video_count: u64,
    pub media_bytes: u64,
    /// Body bytes across every store, shell included.
    pub total_bytes: u64,
}

/// Reply for a message that could not be validated or executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FailureReply {
    pub success: bool,
    pub error: String,
}

/// Reply payload, serialized without a wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum Reply {
    Download(DownloadReply),
    Videos(VideosReply),
    Delete(DeleteReply),
    Clear(ClearReply),
    Status(StatusReply),
    Usage(UsageReply),
    Failed(FailureReply),
}

impl Reply {
    pub fn failure(error: &Error) -> Self {
        Reply::Failed(FailureReply { success: false, error: error.to_string() })
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|e| serde_json::json!({ "success": false, "error": e.to_string() }))
    }
}
