//! SQLite-backed content stores.
//!
//! A single database holds any number of named stores, each mapping a
//! canonical resource identifier to a captured response. It supports:
//!
//! - Implicit store creation on first open
//! - Atomic store reset and batch writes
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entry;
pub mod migrations;
pub mod names;
pub mod storage;

pub use connection::CacheStorage;
pub use entry::{COMPLETE_STATUS, Store, StoredEntry, is_cacheable_status};
pub use names::StoreNames;
