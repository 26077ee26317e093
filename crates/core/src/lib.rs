//! Core types and shared functionality for the storefront catalog layer.
//!
//! This crate provides:
//! - Timed in-memory caches with optional SQLite persistence
//! - Catalog entity types and payload normalization
//! - Change notification channels, broadcasting and refresh binding
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod sync;

pub use cache::{CacheDb, CatalogCache, TimedCache};
pub use config::AppConfig;
pub use error::Error;
pub use model::{CatalogEntity, Category, ChangeAction, ChangeNotification, Collection, EntityType, Product};
pub use sync::{ChangeBroadcaster, ChangeChannel, DataUpdated, MemoryChannel, RefreshBinder, SqliteChannel};
