//! Cache-first with network populate, for streaming media.
//!
//! A complete response is written to the Media Store before it is returned.
//! Partial responses pass through uncached. Failures are terminal: the caller
//! gets a JSON error telling it to download first, and nothing is retried.

use std::sync::Arc;

use vidcache_client::Network;
use vidcache_core::Store;

use super::{RetrievalStrategy, lookup};
use crate::response::{Request, Response, ResponseSource};

pub struct MediaStrategy {
    store: Store,
    network: Arc<dyn Network>,
}

impl MediaStrategy {
    pub fn new(store: Store, network: Arc<dyn Network>) -> Self {
        Self { store, network }
    }
}

#[async_trait::async_trait]
impl RetrievalStrategy for MediaStrategy {
    async fn respond(&self, request: &Request) -> Response {
        let id = &request.id;

        if let Some(entry) = lookup(&self.store, id).await {
            tracing::debug!(url = %id, "media hit");
            return Response::from_entry(entry, ResponseSource::Media);
        }

        tracing::debug!(url = %id, "media miss");
        let response = match self.network.fetch(id.url()).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %id, error = %e, "media unavailable offline");
                return Response::media_offline();
            }
        };

        if response.is_cacheable() {
            if let Err(e) = self.store.put(&response.to_entry(id.as_str())).await {
                tracing::warn!(store = self.store.name(), url = %id, error = %e, "failed to capture media");
            }
        } else {
            tracing::warn!(url = %id, status = response.status.as_u16(), "media response not cacheable, passing through");
        }

        Response::from_network(&response)
    }
}
