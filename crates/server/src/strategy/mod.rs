//! Retrieval strategies: how a request class resolves hits, misses, and
//! network failures.

pub mod media;
pub mod shell;

pub use media::MediaStrategy;
pub use shell::ShellStrategy;

use vidcache_core::{ResourceId, Store, StoredEntry};

use crate::response::{Request, Response};

/// A cache/network precedence policy for one request class.
///
/// Strategies are infallible: every request yields exactly one response.
#[async_trait::async_trait]
pub trait RetrievalStrategy: Send + Sync {
    async fn respond(&self, request: &Request) -> Response;
}

/// Store lookup where a read fault counts as a miss.
pub(crate) async fn lookup(store: &Store, id: &ResourceId) -> Option<StoredEntry> {
    match store.match_entry(id).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(store = store.name(), url = %id, error = %e, "store read failed, treating as miss");
            None
        }
    }
}
