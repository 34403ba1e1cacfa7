//! Foreground clients and which engine version controls them.

use std::collections::HashMap;

use tokio::sync::RwLock;
use vidcache_core::Error;

/// Tracks open foreground clients.
///
/// A client is controlled once an active engine has claimed it. Until then
/// it has no reply channel to the engine and its commands are refused.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    inner: RwLock<Registry>,
}

#[derive(Debug, Default)]
struct Registry {
    /// Version that has claimed clients, if any.
    active: Option<String>,
    clients: HashMap<String, Option<String>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client as open.
    ///
    /// Clients opened after a claim are controlled by the claiming version
    /// right away. Re-registering keeps the current controller.
    pub async fn register(&self, client: &str) {
        let mut inner = self.inner.write().await;
        let active = inner.active.clone();
        inner.clients.entry(client.to_string()).or_insert(active);
    }

    pub async fn unregister(&self, client: &str) -> bool {
        self.inner.write().await.clients.remove(client).is_some()
    }

    /// Make `version` the controller of every open client.
    ///
    /// Returns how many clients changed controller.
    pub async fn claim(&self, version: &str) -> usize {
        let mut inner = self.inner.write().await;
        inner.active = Some(version.to_string());
        let mut claimed = 0;
        for controller in inner.clients.values_mut() {
            if controller.as_deref() != Some(version) {
                *controller = Some(version.to_string());
                claimed += 1;
            }
        }
        claimed
    }

    pub async fn controller(&self, client: &str) -> Option<String> {
        self.inner.read().await.clients.get(client).cloned().flatten()
    }

    /// Precondition for any command: the client must be controlled.
    pub async fn ensure_controlled(&self, client: &str) -> Result<String, Error> {
        self.controller(client)
            .await
            .ok_or_else(|| Error::NotReady(format!("client {client} is not controlled by an active engine")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unclaimed_client_is_not_ready() {
        let registry = ClientRegistry::new();
        registry.register("tab-1").await;

        let result = registry.ensure_controlled("tab-1").await;
        assert!(matches!(result, Err(Error::NotReady(_))));
        assert!(matches!(registry.ensure_controlled("unknown").await, Err(Error::NotReady(_))));
    }

    #[tokio::test]
    async fn test_claim_takes_over_open_clients() {
        let registry = ClientRegistry::new();
        registry.register("tab-1").await;
        registry.register("tab-2").await;

        assert_eq!(registry.claim("v1").await, 2);
        assert_eq!(registry.ensure_controlled("tab-1").await.unwrap(), "v1");

        // newer version takes over without re-registration
        assert_eq!(registry.claim("v2").await, 2);
        assert_eq!(registry.controller("tab-2").await.as_deref(), Some("v2"));
        assert_eq!(registry.claim("v2").await, 0);
    }

    #[tokio::test]
    async fn test_client_opened_after_claim_is_controlled() {
        let registry = ClientRegistry::new();
        registry.claim("v1").await;
        registry.register("tab-late").await;
        assert_eq!(registry.controller("tab-late").await.as_deref(), Some("v1"));

        assert!(registry.unregister("tab-late").await);
        assert!(registry.controller("tab-late").await.is_none());
        assert!(!registry.unregister("tab-late").await);
    }
}
