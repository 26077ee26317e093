//! Client code for the storefront catalog.
//!
//! This crate provides the HTTP fetcher for the catalog API and the cached
//! read and write paths built on it.

pub mod catalog;
pub mod fetch;

pub use catalog::{CatalogAdmin, CatalogStore, ListQuery};
pub use fetch::{FetchError, FetcherConfig, RemoteFetcher, RequestOptions, StaticToken, TokenProvider};
