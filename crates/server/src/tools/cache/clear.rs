//! cache_clear tool implementation.
//!
//! Drops cached lists in this process only; nothing is broadcast.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storefront_core::{CatalogCache, EntityType};

use crate::tools::json_result;

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// Entity type to clear. Clears everything when omitted.
    #[serde(default)]
    pub entity: Option<String>,
}

/// Output from the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearOutput {
    /// Entity types whose cache entries were dropped.
    pub cleared: Vec<String>,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(cache: &CatalogCache, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let targets = match params.entity.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        Some(entity) => vec![entity.parse::<EntityType>()?],
        None => EntityType::ALL.to_vec(),
    };

    for entity in &targets {
        cache.invalidate(*entity).await;
    }

    json_result(&CacheClearOutput { cleared: targets.iter().map(|e| e.to_string()).collect() })
}
