//! Client code for vidcache.
//!
//! This crate provides the network boundary the engine fetches through:
//! the `Network` trait and its reqwest-backed implementation.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, FetchResponse, Network};
pub use reqwest::StatusCode;
