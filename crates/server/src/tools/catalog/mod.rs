//! Catalog read tools.

pub mod get;
pub mod list;
pub mod tree;

pub use get::{CatalogGetParams, get_impl};
pub use list::{CatalogListParams, list_impl};
pub use tree::tree_impl;
