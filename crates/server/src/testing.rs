//! Test doubles shared by engine tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use url::Url;
use vidcache_client::{FetchResponse, Network, StatusCode};
use vidcache_core::{Error, ResourceId};

pub(crate) const ORIGIN: &str = "http://localhost:8080/";

pub(crate) fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub(crate) fn id(path: &str) -> ResourceId {
    ResourceId::parse(&origin(), path).unwrap()
}

#[derive(Clone)]
enum Route {
    Respond { status: u16, content_type: String, body: Vec<u8> },
    Fail,
}

/// Scripted network: unknown URLs fail as if offline.
#[derive(Default)]
pub(crate) struct StubNetwork {
    routes: Mutex<HashMap<String, Route>>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl StubNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, path: &str, status: u16, content_type: &str, body: &[u8]) -> Self {
        self.set(path, Route::Respond { status, content_type: content_type.into(), body: body.to_vec() });
        self
    }

    pub(crate) fn fail(self, path: &str) -> Self {
        self.set(path, Route::Fail);
        self
    }

    pub(crate) fn delay(self, path: &str, delay: Duration) -> Self {
        self.delays.lock().unwrap().insert(id(path).to_string(), delay);
        self
    }

    /// Take a previously reachable URL offline.
    pub(crate) fn go_offline(&self, path: &str) {
        self.set(path, Route::Fail);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn calls_for(&self, path: &str) -> usize {
        let key = id(path).to_string();
        self.calls.lock().unwrap().iter().filter(|u| **u == key).count()
    }

    fn set(&self, path: &str, route: Route) {
        self.routes.lock().unwrap().insert(id(path).to_string(), route);
    }
}

#[async_trait::async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, url: &Url) -> Result<FetchResponse, Error> {
        let key = url.as_str().to_string();
        self.calls.lock().unwrap().push(key.clone());

        let delay = self.delays.lock().unwrap().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let route = self.routes.lock().unwrap().get(&key).cloned();
        match route {
            Some(Route::Respond { status, content_type, body }) => {
                let status = StatusCode::from_u16(status).unwrap();
                Ok(FetchResponse::synthetic(url.clone(), status, Some(&content_type), body))
            }
            Some(Route::Fail) | None => Err(Error::Network(format!("network error: {key} unreachable"))),
        }
    }
}

pub(crate) const CLIENT: &str = crate::handler::HOST_CLIENT;

/// Engine over in-memory storage, installed and active, with the host client
/// controlled. Shell manifest is `./`, `./index.html`, `./fallback.html`.
pub(crate) async fn started_engine(network: StubNetwork) -> std::sync::Arc<crate::engine::Engine> {
    use crate::engine::{Engine, EngineConfig};
    use vidcache_core::{AppConfig, CacheStorage};

    let config = AppConfig {
        shell_manifest: vec!["./".into(), "./index.html".into(), "./fallback.html".into()],
        ..AppConfig::default()
    };
    let network = network
        .respond("./", 200, "text/html", b"<html>root")
        .respond("./index.html", 200, "text/html", b"<html>index")
        .respond("./fallback.html", 200, "text/html", b"<html>offline");

    let storage = CacheStorage::open_in_memory().await.unwrap();
    let engine = Engine::new(EngineConfig::from_app_config(&config).unwrap(), storage, std::sync::Arc::new(network));
    engine.register_client(CLIENT).await;
    engine.start().await.unwrap();
    std::sync::Arc::new(engine)
}

/// JSON payload of a tool result's first text content.
pub(crate) fn tool_json(result: &rmcp::model::CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content.get("text").and_then(|v| v.as_str()).expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
