//! MCP tool implementations.
//!
//! This module contains all tools exposed by the vidcache server.

pub mod fetch;
pub mod videos;

pub use fetch::{FetchResourceParams, fetch_impl};
pub use videos::{PostMessageParams, VideoParams, command_impl, post_message_impl};
