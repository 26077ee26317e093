//! Catalog caching.
//!
//! - [`TimedCache`]: generic in-memory store with a fixed TTL
//! - [`CatalogCache`]: per-entity lists and id indexes built on it
//! - [`CacheDb`]: optional SQLite mirror used across restarts and processes

pub mod catalog;
pub mod connection;
pub mod entries;
pub mod migrations;
pub mod timed;

pub use crate::Error;

pub use catalog::{CachedEntity, CachedSet, CatalogCache};
pub use connection::CacheDb;
pub use entries::StoredEntry;
pub use timed::{CacheEntry, DEFAULT_TTL, TimedCache};
