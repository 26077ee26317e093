//! Cache-related MCP tools.
//!
//! This module provides tools for invalidating the catalog cache, either
//! locally or across every context sharing the change channel.

pub mod clear;
pub mod notify;

pub use clear::{CacheClearParams, clear_impl};
pub use notify::{CatalogNotifyParams, notify_impl};
