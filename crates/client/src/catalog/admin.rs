//! Catalog mutations.
//!
//! Each successful write is announced through the [`ChangeBroadcaster`], so the
//! local cache and every other context drop the affected lists.

use std::sync::Arc;

use serde_json::Value;
use storefront_core::Error;
use storefront_core::model::{ChangeAction, EntityType};
use storefront_core::sync::ChangeBroadcaster;

use super::entity_path;
use crate::fetch::RemoteFetcher;

/// Write side of the catalog. Errors propagate to the caller.
#[derive(Debug, Clone)]
pub struct CatalogAdmin {
    fetcher: RemoteFetcher,
    broadcaster: Arc<ChangeBroadcaster>,
}

impl CatalogAdmin {
    pub fn new(fetcher: RemoteFetcher, broadcaster: Arc<ChangeBroadcaster>) -> Self {
        Self { fetcher, broadcaster }
    }

    /// `POST /api/<plural>`. Returns the created entity as sent by the API.
    pub async fn create(&self, entity: EntityType, body: Value) -> Result<Value, Error> {
        let created = self.fetcher.post(&entity.api_path(), body.clone()).await?;
        let payload = if created.is_null() { body } else { created.clone() };
        self.announce(entity, ChangeAction::Create, payload).await;
        Ok(created)
    }

    /// `PUT /api/<plural>/<id>`.
    pub async fn update(&self, entity: EntityType, id: &str, body: Value) -> Result<Value, Error> {
        let path = entity_path(entity, id)?;
        let updated = self.fetcher.put(&path, body.clone()).await?;
        let payload = if updated.is_null() { with_id(body, id) } else { updated.clone() };
        self.announce(entity, ChangeAction::Update, payload).await;
        Ok(updated)
    }

    /// `DELETE /api/<plural>/<id>`.
    pub async fn delete(&self, entity: EntityType, id: &str) -> Result<Value, Error> {
        let path = entity_path(entity, id)?;
        let deleted = self.fetcher.delete(&path).await?;
        self.announce(entity, ChangeAction::Delete, serde_json::json!({ "id": id })).await;
        Ok(deleted)
    }

    // Channel failures are logged only: the write has already been applied.
    async fn announce(&self, entity: EntityType, action: ChangeAction, payload: Value) {
        if let Err(e) = self.broadcaster.notify(entity, action, payload).await {
            tracing::warn!(entity = %entity, action = %action, error = %e, "failed to broadcast catalog change");
        }
    }
}

fn with_id(mut body: Value, id: &str) -> Value {
    if let Value::Object(map) = &mut body {
        map.entry("id").or_insert_with(|| Value::String(id.to_string()));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetcherConfig, StaticToken};
    use httpmock::Method::{DELETE, POST, PUT};
    use httpmock::MockServer;
    use serde_json::json;
    use std::time::Duration;
    use storefront_core::cache::CatalogCache;
    use storefront_core::model::{Category, Product};
    use storefront_core::sync::{ChangeChannel, MemoryChannel};

    struct Harness {
        admin: CatalogAdmin,
        cache: Arc<CatalogCache>,
        channel: Arc<MemoryChannel>,
    }

    async fn harness(server: &MockServer) -> Harness {
        let config = FetcherConfig { base_url: server.base_url(), ..Default::default() };
        let fetcher = RemoteFetcher::new(config, Arc::new(StaticToken::new("admin-token"))).unwrap();
        let cache = Arc::new(CatalogCache::new(Duration::from_secs(300)));
        let channel = Arc::new(MemoryChannel::new());
        let broadcaster = Arc::new(ChangeBroadcaster::new(cache.clone(), channel.clone()));

        let categories: Vec<Category> = serde_json::from_value(json!([{"id": 1, "name": "Bags"}])).unwrap();
        let products: Vec<Product> = serde_json::from_value(json!([{"id": 5, "name": "Tote"}])).unwrap();
        cache.store_list(categories).await;
        cache.store_list(products).await;

        Harness { admin: CatalogAdmin::new(fetcher, broadcaster), cache, channel }
    }

    #[tokio::test]
    async fn test_update_product_invalidates_and_broadcasts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/api/products/5")
                    .header("authorization", "Bearer admin-token");
                then.status(200).json_body(json!({"id": 5, "name": "Big Tote"}));
            })
            .await;

        let h = harness(&server).await;
        let updated = h
            .admin
            .update(EntityType::Product, "5", json!({"name": "Big Tote"}))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(updated["name"], "Big Tote");

        assert!(h.cache.list::<Product>().await.is_none());
        assert!(h.cache.list::<Category>().await.is_none());

        let latest = h.channel.latest().await.unwrap().unwrap();
        assert_eq!(latest.entity_type, EntityType::Product);
        assert_eq!(latest.action, ChangeAction::Update);
        assert_eq!(latest.payload["name"], "Big Tote");
    }

    #[tokio::test]
    async fn test_create_and_delete_category() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/categories");
                then.status(201).json_body(json!({"id": 2, "name": "Shoes"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/api/categories/2");
                then.status(204);
            })
            .await;

        let h = harness(&server).await;
        h.admin.create(EntityType::Category, json!({"name": "Shoes"})).await.unwrap();
        assert!(h.cache.list::<Category>().await.is_none());
        assert!(h.cache.list::<Product>().await.is_some());

        h.admin.delete(EntityType::Category, "2").await.unwrap();
        let latest = h.channel.latest().await.unwrap().unwrap();
        assert_eq!(latest.action, ChangeAction::Delete);
        assert_eq!(latest.payload, json!({"id": "2"}));
    }

    #[tokio::test]
    async fn test_failed_write_propagates_and_keeps_cache() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/api/products/5");
                then.status(403).json_body(json!({"error": "Forbidden"}));
            })
            .await;

        let h = harness(&server).await;
        let err = h
            .admin
            .update(EntityType::Product, "5", json!({"name": "x"}))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Fetch { status: Some(403), ref message } if message == "Forbidden"));
        assert!(h.cache.list::<Product>().await.is_some());
        assert!(h.channel.latest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unsafe_id_rejected_before_request() {
        let server = MockServer::start_async().await;
        let any = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(200);
            })
            .await;

        let h = harness(&server).await;
        let err = h.admin.delete(EntityType::Product, "../orders").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        any.assert_hits_async(0).await;
        assert!(h.channel.latest().await.unwrap().is_none());
        assert!(h.cache.list::<Product>().await.is_some());
    }

    #[test]
    fn test_with_id_fills_missing_id() {
        assert_eq!(with_id(json!({"name": "a"}), "3"), json!({"name": "a", "id": "3"}));
        assert_eq!(with_id(json!({"id": 9}), "3"), json!({"id": 9}));
    }
}
