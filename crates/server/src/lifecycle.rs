//! Install-time shell pre-population and activation-time store sweep.
//!
//! ```text
//! Idle -> Installing -> Installed -> Activating -> Active
//!              \
//!               -> Redundant (any manifest fetch failed)
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use vidcache_client::Network;
use vidcache_core::{CacheStorage, Error, ResourceId, StoreNames, StoredEntry};

use crate::clients::ClientRegistry;

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Idle,
    Installing,
    Installed,
    Activating,
    Active,
    /// Install failed; this version never activates.
    Redundant,
}

/// Outcome of the activation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
    /// Stale stores whose deletion failed, with the error.
    pub failed: Vec<(String, String)>,
    pub claimed_clients: usize,
}

pub struct LifecycleManager {
    storage: CacheStorage,
    names: StoreNames,
    version: String,
    manifest: Vec<ResourceId>,
    network: Arc<dyn Network>,
    clients: Arc<ClientRegistry>,
    concurrency: usize,
    state: RwLock<WorkerState>,
}

impl LifecycleManager {
    pub fn new(
        storage: CacheStorage, names: StoreNames, version: impl Into<String>, manifest: Vec<ResourceId>,
        network: Arc<dyn Network>, clients: Arc<ClientRegistry>,
    ) -> Self {
        Self {
            storage,
            names,
            version: version.into(),
            manifest,
            network,
            clients,
            concurrency: 4,
            state: RwLock::new(WorkerState::Idle),
        }
    }

    /// Maximum manifest fetches in flight during install.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub async fn is_active(&self) -> bool {
        self.state().await == WorkerState::Active
    }

    async fn transition(&self, to: WorkerState) {
        let mut state = self.state.write().await;
        tracing::info!(version = %self.version, from = ?*state, to = ?to, "lifecycle transition");
        *state = to;
    }

    /// Pre-populate the App-Shell Store with every manifest resource.
    ///
    /// All or nothing: a failed or non-200 fetch aborts the install before
    /// anything is written, and the engine becomes redundant.
    pub async fn install(&self) -> Result<(), Error> {
        {
            let mut state = self.state.write().await;
            if !matches!(*state, WorkerState::Idle | WorkerState::Redundant) {
                return Err(Error::InvalidInput(format!("cannot install from state {:?}", *state)));
            }
            *state = WorkerState::Installing;
        }
        tracing::info!(version = %self.version, resources = self.manifest.len(), "installing app shell");

        match self.populate_shell().await {
            Ok(count) => {
                tracing::info!(store = %self.names.app_shell, count, "app shell cached");
                // skip waiting: go straight to installed
                self.transition(WorkerState::Installed).await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(version = %self.version, error = %e, "install failed");
                self.transition(WorkerState::Redundant).await;
                Err(e)
            }
        }
    }

    async fn populate_shell(&self) -> Result<usize, Error> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for (index, id) in self.manifest.iter().cloned().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::InstallFailed(e.to_string()))?;
            let network = self.network.clone();

            join_set.spawn(async move {
                let _permit = permit;
                let result = network.fetch(id.url()).await;
                (index, id, result)
            });
        }

        let mut entries: Vec<(usize, StoredEntry)> = Vec::with_capacity(self.manifest.len());
        while let Some(joined) = join_set.join_next().await {
            let (index, id, result) = joined.map_err(|e| Error::InstallFailed(e.to_string()))?;
            let response = result.map_err(|e| Error::InstallFailed(format!("{id}: {e}")))?;
            if !response.is_cacheable() {
                return Err(Error::InstallFailed(format!("{id}: status {}", response.status.as_u16())));
            }
            entries.push((index, response.to_entry(id.as_str())));
        }

        entries.sort_by_key(|(index, _)| *index);
        let entries: Vec<StoredEntry> = entries.into_iter().map(|(_, entry)| entry).collect();

        let store = self.storage.open_store(&self.names.app_shell).await?;
        store
            .put_all(&entries)
            .await
            .map_err(|e| Error::InstallFailed(format!("writing {}: {e}", store.name())))?;
        Ok(entries.len())
    }

    /// Delete stale stores, then claim every open client.
    ///
    /// Each stale store is deleted independently; a failed delete is logged
    /// and reported without stopping the sweep.
    pub async fn activate(&self) -> Result<SweepReport, Error> {
        {
            let mut state = self.state.write().await;
            if *state != WorkerState::Installed {
                return Err(Error::NotReady(format!("cannot activate from state {:?}", *state)));
            }
            *state = WorkerState::Activating;
        }

        let mut report = SweepReport::default();
        let existing = match self.storage.keys().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "failed to enumerate stores, skipping sweep");
                Vec::new()
            }
        };

        for name in existing {
            if !self.names.is_stale(&name) {
                report.kept.push(name);
                continue;
            }
            match self.storage.delete(&name).await {
                Ok(_) => {
                    tracing::info!(store = %name, "deleted stale store");
                    report.deleted.push(name);
                }
                Err(e) => {
                    tracing::warn!(store = %name, error = %e, "failed to delete stale store");
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        report.claimed_clients = self.clients.claim(&self.version).await;
        self.transition(WorkerState::Active).await;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubNetwork, id};

    const MANIFEST: [&str; 3] = ["./", "./index.html", "./fallback.html"];

    fn manifest() -> Vec<ResourceId> {
        MANIFEST.into_iter().map(id).collect()
    }

    fn reachable_shell() -> StubNetwork {
        StubNetwork::new()
            .respond("./", 200, "text/html", b"<html>root")
            .respond("./index.html", 200, "text/html", b"<html>index")
            .respond("./fallback.html", 200, "text/html", b"<html>offline")
    }

    async fn manager(network: StubNetwork, names: StoreNames) -> (LifecycleManager, CacheStorage, Arc<ClientRegistry>) {
        let storage = CacheStorage::open_in_memory().await.unwrap();
        let clients = Arc::new(ClientRegistry::new());
        let lifecycle =
            LifecycleManager::new(storage.clone(), names, "v2", manifest(), Arc::new(network), clients.clone())
                .with_concurrency(2);
        (lifecycle, storage, clients)
    }

    #[tokio::test]
    async fn test_install_caches_whole_manifest_in_order() {
        let (lifecycle, storage, _) = manager(reachable_shell(), StoreNames::versioned("v2", None)).await;

        lifecycle.install().await.unwrap();
        assert_eq!(lifecycle.state().await, WorkerState::Installed);

        let keys = storage.store("app-shell-v2").keys().await.unwrap();
        let expected: Vec<String> = manifest().iter().map(|id| id.to_string()).collect();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let network = reachable_shell().respond("./index.html", 404, "text/html", b"gone");
        let (lifecycle, storage, _) = manager(network, StoreNames::versioned("v2", None)).await;

        let result = lifecycle.install().await;
        assert!(matches!(result, Err(Error::InstallFailed(_))));
        assert_eq!(lifecycle.state().await, WorkerState::Redundant);
        assert!(storage.store("app-shell-v2").keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_fails_when_offline() {
        let network = reachable_shell().fail("./fallback.html");
        let (lifecycle, storage, _) = manager(network, StoreNames::versioned("v2", None)).await;

        assert!(lifecycle.install().await.is_err());
        assert!(!storage.has("app-shell-v2").await.unwrap());
        assert!(matches!(lifecycle.activate().await, Err(Error::NotReady(_))));
    }

    #[tokio::test]
    async fn test_activate_sweeps_stale_stores() {
        let (lifecycle, storage, _) = manager(reachable_shell(), StoreNames::new("v2-app", "media-v1")).await;
        for name in ["v1-app", "v2-app", "media-v1"] {
            storage.open_store(name).await.unwrap();
        }

        lifecycle.install().await.unwrap();
        let report = lifecycle.activate().await.unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["v2-app", "media-v1"]);
        assert_eq!(report.deleted, vec!["v1-app"]);
        assert_eq!(report.kept, vec!["v2-app", "media-v1"]);
        assert!(report.failed.is_empty());
        assert!(lifecycle.is_active().await);
    }

    #[tokio::test]
    async fn test_activate_keeps_legacy_store() {
        let names = StoreNames::versioned("v2", None).with_legacy("nepal-gov-v1");
        let (lifecycle, storage, _) = manager(reachable_shell(), names).await;
        storage.open_store("nepal-gov-v1").await.unwrap();
        storage.open_store("videos-v1").await.unwrap();

        lifecycle.install().await.unwrap();
        lifecycle.activate().await.unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["nepal-gov-v1", "app-shell-v2"]);
    }

    #[tokio::test]
    async fn test_activate_claims_open_clients() {
        let (lifecycle, _, clients) = manager(reachable_shell(), StoreNames::versioned("v2", None)).await;
        clients.register("tab-1").await;

        lifecycle.install().await.unwrap();
        assert!(clients.ensure_controlled("tab-1").await.is_err());

        let report = lifecycle.activate().await.unwrap();
        assert_eq!(report.claimed_clients, 1);
        assert_eq!(clients.ensure_controlled("tab-1").await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_install_twice_is_rejected() {
        let (lifecycle, _, _) = manager(reachable_shell(), StoreNames::versioned("v2", None)).await;
        lifecycle.install().await.unwrap();
        assert!(matches!(lifecycle.install().await, Err(Error::InvalidInput(_))));
    }
}
