//! Offline cache engine for vidcache.
//!
//! Intercepts resource requests, serves them from versioned content stores,
//! and executes foreground commands that manage downloaded videos. The
//! `vidcache` binary exposes the engine over MCP.

pub mod classify;
pub mod clients;
pub mod command;
pub mod engine;
pub mod handler;
pub mod intercept;
pub mod lifecycle;
pub mod response;
pub mod strategy;
pub mod tools;

#[cfg(test)]
mod testing;

pub use engine::{Engine, EngineConfig};
pub use handler::{HOST_CLIENT, VidcacheServer};
