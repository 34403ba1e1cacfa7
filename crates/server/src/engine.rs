//! The offline cache engine: storage, network, strategies, lifecycle, and
//! commands wired together from one explicit configuration.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use url::Url;
use vidcache_client::Network;
use vidcache_core::{AppConfig, CacheStorage, Error, ResourceId, StoreNames};

use crate::classify::MediaClassifier;
use crate::clients::ClientRegistry;
use crate::command::{Command, CommandChannel, CommandExecutor, Dispatcher, Reply};
use crate::intercept::Interceptor;
use crate::lifecycle::{LifecycleManager, SweepReport, WorkerState};
use crate::response::{Request, Response};
use crate::strategy::{MediaStrategy, ShellStrategy};

/// Everything version-specific the engine needs, passed in at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub version: String,
    pub names: StoreNames,
    pub origin: Url,
    pub manifest: Vec<ResourceId>,
    pub fallback: ResourceId,
    pub classifier: MediaClassifier,
    pub install_concurrency: usize,
    pub command_buffer: usize,
}

impl EngineConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url()?;
        let manifest = config
            .shell_manifest
            .iter()
            .map(|path| ResourceId::parse(&origin, path))
            .collect::<Result<Vec<_>, _>>()?;
        let fallback = ResourceId::parse(&origin, &config.fallback_document)?;

        Ok(Self {
            version: config.version.clone(),
            names: config.store_names(),
            origin,
            manifest,
            fallback,
            classifier: MediaClassifier::from_config(config),
            install_concurrency: config.install_concurrency,
            command_buffer: config.command_buffer,
        })
    }
}

pub struct Engine {
    config: EngineConfig,
    storage: CacheStorage,
    interceptor: Interceptor,
    lifecycle: LifecycleManager,
    clients: Arc<ClientRegistry>,
    commands: CommandChannel,
    dispatcher: Mutex<Option<Dispatcher>>,
}

impl Engine {
    /// Build the engine. Must be called inside a tokio runtime.
    pub fn new(config: EngineConfig, storage: CacheStorage, network: Arc<dyn Network>) -> Self {
        let shell = ShellStrategy::new(
            storage.store(&config.names.app_shell),
            config.fallback.clone(),
            config.classifier.clone(),
            network.clone(),
        );
        let media = MediaStrategy::new(storage.store(&config.names.media), network.clone());
        let interceptor = Interceptor::new(config.classifier.clone(), Arc::new(shell), Arc::new(media));

        let clients = Arc::new(ClientRegistry::new());
        let lifecycle = LifecycleManager::new(
            storage.clone(),
            config.names.clone(),
            config.version.clone(),
            config.manifest.clone(),
            network.clone(),
            clients.clone(),
        )
        .with_concurrency(config.install_concurrency);

        let executor = CommandExecutor::new(storage.clone(), config.names.media.clone(), config.origin.clone(), network);
        let (commands, dispatcher) = CommandChannel::spawn(Arc::new(executor), config.command_buffer);

        let dispatcher = Mutex::new(Some(dispatcher));

        Self { config, storage, interceptor, lifecycle, clients, commands, dispatcher }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.state().await
    }

    /// Install, then activate.
    pub async fn start(&self) -> Result<SweepReport, Error> {
        self.lifecycle.install().await?;
        let report = self.lifecycle.activate().await?;
        tracing::info!(
            version = %self.config.version,
            kept = ?report.kept,
            deleted = ?report.deleted,
            failed = report.failed.len(),
            claimed = report.claimed_clients,
            "engine active"
        );
        Ok(report)
    }

    /// Normalize a caller-supplied identifier against the origin.
    pub fn resolve(&self, input: &str) -> Result<ResourceId, Error> {
        Ok(ResourceId::parse(&self.config.origin, input)?)
    }

    /// Intercept one outbound request.
    pub async fn fetch(&self, request: &Request) -> Response {
        self.interceptor.handle(request).await
    }

    pub async fn register_client(&self, client: &str) {
        self.clients.register(client).await;
    }

    /// Forget a closed client. Returns whether it was registered.
    pub async fn unregister_client(&self, client: &str) -> bool {
        self.clients.unregister(client).await
    }

    /// Post a raw wire message on behalf of `client`.
    ///
    /// Fails with `NotReady` before anything runs if the engine does not
    /// control the client.
    pub async fn post_message(&self, client: &str, message: Value) -> Result<Reply, Error> {
        self.clients.ensure_controlled(client).await?;
        self.commands.post(message).await
    }

    pub async fn execute(&self, client: &str, command: Command) -> Result<Reply, Error> {
        self.clients.ensure_controlled(client).await?;
        self.commands.send(command).await
    }

    /// Stop taking commands, wait for the ones already accepted, then wait
    /// for background shell writes.
    pub async fn shutdown(&self) {
        if let Some(dispatcher) = self.dispatcher.lock().await.take() {
            dispatcher.stop().await;
        }
        self.interceptor.flush().await;
        tracing::info!(version = %self.config.version, "engine stopped");
    }
}
