//! Core types and shared functionality for vidcache.
//!
//! This crate provides:
//! - Named content stores with a SQLite backend
//! - Canonical resource identifiers
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod error;
pub mod resource;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use resource::{ResourceId, UrlError};
pub use store::{CacheStorage, Store, StoreNames, StoredEntry};
