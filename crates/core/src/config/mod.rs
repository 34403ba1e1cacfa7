//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (VIDCACHE_*)
//! 2. TOML config file (if VIDCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::store::StoreNames;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (VIDCACHE_*)
/// 2. TOML config file (if VIDCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding every store.
    ///
    /// Set via VIDCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via VIDCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via VIDCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via VIDCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum redirects followed per fetch.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Origin that relative resource identifiers resolve against.
    ///
    /// Set via VIDCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Release version qualifying the store names.
    ///
    /// Set via VIDCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Generic store from older releases that the sweep must keep.
    #[serde(default = "default_legacy_store")]
    pub legacy_store: Option<String>,

    /// Shell resources pre-populated on install, in order.
    #[serde(default = "default_shell_manifest")]
    pub shell_manifest: Vec<String>,

    /// Document served for failed navigations. Must be in the manifest.
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,

    /// File extensions that mark a request as media.
    #[serde(default = "default_media_extensions")]
    pub media_extensions: Vec<String>,

    /// Path segments that mark a request as media.
    #[serde(default = "default_media_segments")]
    pub media_segments: Vec<String>,

    /// Manifest fetches in flight during install.
    #[serde(default = "default_install_concurrency")]
    pub install_concurrency: usize,

    /// Commands queued before senders wait.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./vidcache.sqlite")
}

fn default_user_agent() -> String {
    "vidcache/0.1".into()
}

fn default_max_bytes() -> usize {
    512 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    120_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_legacy_store() -> Option<String> {
    Some("nepal-gov-v1".into())
}

fn default_shell_manifest() -> Vec<String> {
    [
        "./",
        "./index.html",
        "./style.css",
        "./app.js",
        "./manifest.json",
        "./icons/icon-192.png",
        "./icons/icon-512.png",
        "./fallback.html",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_fallback_document() -> String {
    "./fallback.html".into()
}

fn default_media_extensions() -> Vec<String> {
    vec![".mp4".into(), ".webm".into(), ".m4v".into()]
}

fn default_media_segments() -> Vec<String> {
    vec!["video".into(), "videos".into()]
}

fn default_install_concurrency() -> usize {
    4
}

fn default_command_buffer() -> usize {
    32
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            origin: default_origin(),
            version: default_version(),
            legacy_store: default_legacy_store(),
            shell_manifest: default_shell_manifest(),
            fallback_document: default_fallback_document(),
            media_extensions: default_media_extensions(),
            media_segments: default_media_segments(),
            install_concurrency: default_install_concurrency(),
            command_buffer: default_command_buffer(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {other}") }),
        }
    }

    /// Store names for the configured release.
    pub fn store_names(&self) -> StoreNames {
        StoreNames::versioned(&self.version, self.legacy_store.clone())
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `VIDCACHE_`
    /// 2. TOML file from `VIDCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("VIDCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("VIDCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
