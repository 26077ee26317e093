//! catalog_get tool implementation.
//!
//! Looks up one entity by id, from the id index first and the API otherwise.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storefront_client::CatalogStore;
use storefront_core::cache::CachedEntity;
use storefront_core::{Category, Collection, EntityType, Error, Product};

use crate::tools::json_result;

/// Parameters for the catalog_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogGetParams {
    /// Entity type: "category", "product" or "collection" (plural accepted).
    pub entity: String,

    /// Entity id.
    pub id: String,
}

/// Output from the catalog_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogGetOutput {
    pub entity: String,
    pub item: serde_json::Value,
    /// Resolved category name for products.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_label: Option<String>,
}

/// Implementation of the catalog_get tool.
pub async fn get_impl(store: &CatalogStore, params: CatalogGetParams) -> Result<CallToolResult, McpError> {
    let entity: EntityType = params.entity.parse()?;
    let id = params.id.trim();
    if id.is_empty() {
        return Err(Error::InvalidInput("id must not be empty".to_string()).into());
    }

    let output = match entity {
        EntityType::Product => {
            let product = find::<Product>(store, id).await?;
            let mut output = item_output(entity, &product)?;
            output.category_label = Some(store.category_label(&product).await);
            output
        }
        EntityType::Category => item_output(entity, &find::<Category>(store, id).await?)?,
        EntityType::Collection => item_output(entity, &find::<Collection>(store, id).await?)?,
    };

    json_result(&output)
}

async fn find<T: CachedEntity>(store: &CatalogStore, id: &str) -> Result<T, Error> {
    store
        .get_by_id::<T>(id)
        .await
        .ok_or_else(|| Error::CacheMiss(format!("{} {id} not found", T::KIND)))
}

fn item_output<T: Serialize>(entity: EntityType, item: &T) -> Result<CatalogGetOutput, Error> {
    Ok(CatalogGetOutput { entity: entity.to_string(), item: serde_json::to_value(item)?, category_label: None })
}
