//! catalog_list tool implementation.
//!
//! Lists categories, products or collections. Unfiltered requests are served
//! from cache; any filter, search term or `force` goes to the API.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storefront_client::{CatalogStore, ListQuery};
use storefront_core::cache::CachedEntity;
use storefront_core::{Category, Collection, EntityType, Error, Product};

use crate::tools::json_result;

/// Parameters for the catalog_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogListParams {
    /// Entity type: "category", "product" or "collection" (plural accepted).
    pub entity: String,

    /// Restrict products to this category id.
    #[serde(default)]
    pub category: Option<String>,

    /// Only trending products.
    #[serde(default)]
    pub trending: Option<bool>,

    /// Only best sellers.
    #[serde(default)]
    pub best_seller: Option<bool>,

    /// Only new arrivals.
    #[serde(default)]
    pub new_arrival: Option<bool>,

    /// Free-text search term.
    #[serde(default)]
    pub search: Option<String>,

    /// Maximum number of items to return.
    #[serde(default)]
    pub limit: Option<u32>,

    /// Number of items to skip.
    #[serde(default)]
    pub offset: Option<u32>,

    /// Bypass the cache and refresh it (default: false).
    #[serde(default)]
    pub force: bool,
}

impl CatalogListParams {
    fn query(&self) -> ListQuery {
        ListQuery {
            force: self.force,
            category: self.category.clone(),
            trending: self.trending,
            best_seller: self.best_seller,
            new_arrival: self.new_arrival,
            search: self.search.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Output from the catalog_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogListOutput {
    pub entity: String,
    pub count: usize,
    pub items: serde_json::Value,
}

/// Implementation of the catalog_list tool.
pub async fn list_impl(store: &CatalogStore, params: CatalogListParams) -> Result<CallToolResult, McpError> {
    let entity: EntityType = params.entity.parse()?;
    let query = params.query();

    let (count, items) = match entity {
        EntityType::Category => collect::<Category>(store, &query).await?,
        EntityType::Product => collect::<Product>(store, &query).await?,
        EntityType::Collection => collect::<Collection>(store, &query).await?,
    };

    json_result(&CatalogListOutput { entity: entity.plural().to_string(), count, items })
}

async fn collect<T: CachedEntity>(
    store: &CatalogStore, query: &ListQuery,
) -> Result<(usize, serde_json::Value), Error> {
    let items = store.load_all::<T>(query).await;
    Ok((items.len(), serde_json::to_value(items.as_slice())?))
}
