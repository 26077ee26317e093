//! catalog_notify tool implementation.
//!
//! Announces an out-of-band catalog change: drops the local cache entries and
//! tells every other context on the change channel to do the same.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use storefront_core::{ChangeAction, ChangeBroadcaster, EntityType, Error};

use crate::tools::json_result;

/// Parameters for the catalog_notify tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogNotifyParams {
    /// Entity type that changed: "category", "product" or "collection".
    pub entity: String,

    /// What happened: "create", "update" or "delete".
    pub action: String,

    /// Optional payload describing the change (e.g. the changed entity).
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Output from the catalog_notify tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CatalogNotifyOutput {
    /// Whether the notification reached the change channel.
    pub notified: bool,
    /// Entity types whose cache entries were dropped locally.
    pub invalidated: Vec<String>,
}

/// Implementation of the catalog_notify tool.
///
/// A channel failure is reported as `notified: false`; the local
/// invalidation has happened either way.
pub async fn notify_impl(
    broadcaster: &ChangeBroadcaster, params: CatalogNotifyParams,
) -> Result<CallToolResult, McpError> {
    let entity: EntityType = params.entity.parse()?;
    let action: ChangeAction = params.action.parse()?;
    let payload = params.payload.unwrap_or(serde_json::Value::Null);

    let (notified, invalidated) = match broadcaster.notify(entity, action, payload).await {
        Ok(targets) => (true, targets),
        Err(Error::Channel(msg)) => {
            tracing::warn!(entity = %entity, "change notification not delivered: {msg}");
            (false, entity.invalidation_targets().to_vec())
        }
        Err(e) => return Err(e.into()),
    };

    json_result(&CatalogNotifyOutput {
        notified,
        invalidated: invalidated.iter().map(|e| e.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{broadcaster, output, store};
    use serde_json::json;
    use storefront_core::{Category, Product};

    fn params(entity: &str, action: &str) -> CatalogNotifyParams {
        CatalogNotifyParams { entity: entity.to_string(), action: action.to_string(), payload: None }
    }

    #[tokio::test]
    async fn test_notify_product_cascades() {
        let store = store("http://127.0.0.1:1".to_string());
        let categories: Vec<Category> = serde_json::from_value(json!([{"id": 1, "name": "Bags"}])).unwrap();
        let products: Vec<Product> = serde_json::from_value(json!([{"id": 2, "name": "Tote"}])).unwrap();
        store.cache().store_list(categories).await;
        store.cache().store_list(products).await;

        let broadcaster = broadcaster(&store);
        let result = notify_impl(&broadcaster, params("product", "updated")).await.unwrap();
        let out: CatalogNotifyOutput = output(&result);

        assert!(out.notified);
        assert_eq!(out.invalidated, vec!["product", "category"]);
        assert!(store.cache().list::<Product>().await.is_none());
        assert!(store.cache().list::<Category>().await.is_none());
    }

    #[tokio::test]
    async fn test_notify_rejects_unknown_action() {
        let store = store("http://127.0.0.1:1".to_string());
        let err = notify_impl(&broadcaster(&store), params("collection", "archive")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
