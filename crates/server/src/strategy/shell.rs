//! Cache-first with shell fallback, for generic resources.
//!
//! 1. App-Shell Store hit: replay the entry, no network.
//! 2. Miss: fetch. A complete non-media response is persisted in the
//!    background and returned without waiting for the write.
//! 3. Network failure: navigations get the fallback document, everything
//!    else gets the synthetic offline response.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use vidcache_client::{FetchResponse, Network};
use vidcache_core::{ResourceId, Store};

use super::{RetrievalStrategy, lookup};
use crate::classify::MediaClassifier;
use crate::response::{Request, Response, ResponseSource};

pub struct ShellStrategy {
    store: Store,
    fallback: ResourceId,
    classifier: MediaClassifier,
    network: Arc<dyn Network>,
    pending: Mutex<JoinSet<()>>,
}

impl ShellStrategy {
    pub fn new(store: Store, fallback: ResourceId, classifier: MediaClassifier, network: Arc<dyn Network>) -> Self {
        Self { store, fallback, classifier, network, pending: Mutex::new(JoinSet::new()) }
    }

    /// Wait for every background persist started so far.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock().await);
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "background persist task failed");
            }
        }
    }

    async fn persist_later(&self, id: &ResourceId, response: &FetchResponse) {
        let store = self.store.clone();
        let entry = response.to_entry(id.as_str());
        let url = id.to_string();

        let mut pending = self.pending.lock().await;
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            match store.put(&entry).await {
                Ok(()) => tracing::debug!(store = store.name(), %url, "captured generic resource"),
                Err(e) => tracing::warn!(store = store.name(), %url, error = %e, "failed to capture generic resource"),
            }
        });
    }

    async fn fallback_for(&self, request: &Request) -> Response {
        if request.is_navigation()
            && let Some(entry) = lookup(&self.store, &self.fallback).await
        {
            return Response::from_entry(entry, ResponseSource::Fallback);
        }
        Response::offline()
    }
}

#[async_trait::async_trait]
impl RetrievalStrategy for ShellStrategy {
    async fn respond(&self, request: &Request) -> Response {
        let id = &request.id;

        if let Some(entry) = lookup(&self.store, id).await {
            tracing::debug!(url = %id, "app shell hit");
            return Response::from_entry(entry, ResponseSource::AppShell);
        }

        tracing::debug!(url = %id, "app shell miss");
        match self.network.fetch(id.url()).await {
            Ok(response) => {
                // The interceptor routes media paths elsewhere; direct callers may not.
                if response.is_cacheable() && !self.classifier.is_media_path(id) {
                    self.persist_later(id, &response).await;
                } else if !response.is_cacheable() {
                    tracing::warn!(url = %id, status = response.status.as_u16(), "not caching incomplete response");
                }
                Response::from_network(&response)
            }
            Err(e) => {
                tracing::debug!(url = %id, error = %e, "generic fetch failed, serving offline fallback");
                self.fallback_for(request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{Destination, OFFLINE_BODY};
    use crate::testing::{StubNetwork, id};
    use vidcache_core::{CacheStorage, StoredEntry};

    async fn setup(network: StubNetwork) -> (ShellStrategy, Store, Arc<StubNetwork>) {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let store = storage.store("app-shell-v1");
        let network = Arc::new(network);
        let strategy =
            ShellStrategy::new(store.clone(), id("./fallback.html"), MediaClassifier::default(), network.clone());
        (strategy, store, network)
    }

    fn entry(path: &str, body: &[u8]) -> StoredEntry {
        StoredEntry::new(id(path).as_str(), 200, body.to_vec()).with_content_type("text/html")
    }

    #[tokio::test]
    async fn test_hit_skips_network() {
        let (strategy, store, network) = setup(StubNetwork::new()).await;
        store.put(&entry("/index.html", b"<html>cached")).await.unwrap();

        let response = strategy.respond(&Request::new(id("./index.html"), Destination::Document)).await;
        assert_eq!(response.source, ResponseSource::AppShell);
        assert_eq!(&response.body[..], b"<html>cached");
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_fetches_and_persists() {
        let network = StubNetwork::new().respond("/style.css", 200, "text/css", b"body{}");
        let (strategy, store, network) = setup(network).await;

        let response = strategy.respond(&Request::new(id("/style.css"), Destination::Style)).await;
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(&response.body[..], b"body{}");

        strategy.flush().await;
        assert!(store.contains(&id("/style.css")).await.unwrap());

        let again = strategy.respond(&Request::new(id("/style.css"), Destination::Style)).await;
        assert_eq!(again.source, ResponseSource::AppShell);
        assert_eq!(network.calls_for("/style.css"), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_returned_not_stored() {
        let network = StubNetwork::new().respond("/missing.js", 404, "text/plain", b"nope");
        let (strategy, store, _) = setup(network).await;

        let response = strategy.respond(&Request::new(id("/missing.js"), Destination::Script)).await;
        assert_eq!(response.status, 404);

        strategy.flush().await;
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_media_path_is_not_captured_in_shell() {
        let network = StubNetwork::new().respond("/videos/a.mp4", 200, "video/mp4", b"frames");
        let (strategy, store, _) = setup(network).await;

        let response = strategy.respond(&Request::new(id("/videos/a.mp4"), Destination::Other)).await;
        assert_eq!(response.status, 200);

        strategy.flush().await;
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_navigation_offline_gets_fallback_document() {
        let (strategy, store, _) = setup(StubNetwork::new()).await;
        store.put(&entry("./fallback.html", b"<h1>You are offline</h1>")).await.unwrap();

        let response = strategy.respond(&Request::new(id("/some/page.html"), Destination::Document)).await;
        assert_eq!(response.source, ResponseSource::Fallback);
        assert_eq!(&response.body[..], b"<h1>You are offline</h1>");
    }

    #[tokio::test]
    async fn test_subresource_offline_gets_plain_text() {
        let (strategy, store, _) = setup(StubNetwork::new()).await;
        store.put(&entry("./fallback.html", b"<h1>You are offline</h1>")).await.unwrap();

        let response = strategy.respond(&Request::new(id("/app.js"), Destination::Script)).await;
        assert_eq!(response.source, ResponseSource::Offline);
        assert_eq!(&response.body[..], OFFLINE_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_navigation_offline_without_fallback_entry() {
        let (strategy, _, _) = setup(StubNetwork::new()).await;

        let response = strategy.respond(&Request::new(id("/"), Destination::Document)).await;
        assert_eq!(response.source, ResponseSource::Offline);
        assert_eq!(response.status, 200);
    }
}
