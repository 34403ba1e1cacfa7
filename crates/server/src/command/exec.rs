//! Command execution against the Media Store.
//!
//! Every action is idempotent: deleting an absent entry, clearing an empty
//! store, and downloading a present entry all succeed and converge.

use std::sync::Arc;

use url::Url;
use vidcache_client::Network;
use vidcache_core::{CacheStorage, Error, ResourceId, Store};

use super::{ClearReply, Command, DeleteReply, DownloadReply, Reply, StatusReply, UsageReply, VideosReply};

pub struct CommandExecutor {
    storage: CacheStorage,
    media_store: String,
    origin: Url,
    network: Arc<dyn Network>,
}

impl CommandExecutor {
    pub fn new(storage: CacheStorage, media_store: impl Into<String>, origin: Url, network: Arc<dyn Network>) -> Self {
        Self { storage, media_store: media_store.into(), origin, network }
    }

    fn media(&self) -> Store {
        self.storage.store(&self.media_store)
    }

    fn resolve(&self, video_url: &str) -> Result<ResourceId, Error> {
        Ok(ResourceId::parse(&self.origin, video_url)?)
    }

    /// Validate a raw message and execute it. Never fails: problems become
    /// a failure reply.
    pub async fn handle(&self, message: serde_json::Value) -> Reply {
        match Command::from_message(message) {
            Ok(command) => self.execute(command).await,
            Err(e) => {
                tracing::warn!(error = %e, "rejected command message");
                Reply::failure(&e)
            }
        }
    }

    pub async fn execute(&self, command: Command) -> Reply {
        let action = command.action();
        tracing::info!(action, "executing command");

        let result = match command {
            Command::DownloadVideo { video_url } => return self.download(&video_url).await,
            Command::GetDownloadedVideos => self.list().await,
            Command::DeleteVideo { video_url } => self.delete(&video_url).await,
            Command::ClearAllVideos => self.clear().await,
            Command::CheckVideoStatus { video_url } => self.status(&video_url).await,
            Command::GetStorageUsage => self.usage().await,
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(action, error = %e, "command failed");
            Reply::failure(&e)
        })
    }

    async fn download(&self, video_url: &str) -> Reply {
        let failed = |video_url: String, e: Error| {
            tracing::warn!(url = %video_url, error = %e, "download failed");
            Reply::Download(DownloadReply { success: false, video_url, error: Some(e.to_string()) })
        };

        let id = match self.resolve(video_url) {
            Ok(id) => id,
            Err(e) => return failed(video_url.to_string(), e),
        };
        let store = self.media();

        match store.contains(&id).await {
            Ok(true) => {
                tracing::debug!(url = %id, "already downloaded");
                return Reply::Download(DownloadReply { success: true, video_url: id.to_string(), error: None });
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(url = %id, error = %e, "presence check failed, downloading anyway"),
        }

        let response = match self.network.fetch(id.url()).await {
            Ok(response) => response,
            Err(e) => return failed(id.to_string(), e),
        };
        if !response.is_cacheable() {
            return failed(id.to_string(), Error::NotCacheable(response.status.as_u16()));
        }
        if let Err(e) = store.put(&response.to_entry(id.as_str())).await {
            return failed(id.to_string(), e);
        }

        tracing::info!(url = %id, bytes = response.bytes.len(), "video downloaded");
        Reply::Download(DownloadReply { success: true, video_url: id.to_string(), error: None })
    }

    async fn list(&self) -> Result<Reply, Error> {
        let videos = self.media().keys().await?;
        Ok(Reply::Videos(VideosReply { videos }))
    }

    async fn delete(&self, video_url: &str) -> Result<Reply, Error> {
        let id = self.resolve(video_url)?;
        let deleted = self.media().delete(&id).await?;
        tracing::info!(url = %id, deleted, "video deleted");
        Ok(Reply::Delete(DeleteReply { success: true, deleted }))
    }

    async fn clear(&self) -> Result<Reply, Error> {
        self.storage.reset(&self.media_store).await?;
        tracing::info!(store = %self.media_store, "media store cleared");
        Ok(Reply::Clear(ClearReply { success: true }))
    }

    async fn status(&self, video_url: &str) -> Result<Reply, Error> {
        let id = self.resolve(video_url)?;
        let is_cached = self.media().contains(&id).await?;
        Ok(Reply::Status(StatusReply { is_cached, video_url: id.to_string() }))
    }

    async fn usage(&self) -> Result<Reply, Error> {
        let (video_count, media_bytes) = self.media().usage().await?;
        let total_bytes = self.storage.usage().await?;
        Ok(Reply::Usage(UsageReply { video_count, media_bytes, total_bytes }))
    }
}
