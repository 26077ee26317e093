//! Catalog cache: one list entry per entity type plus an id index per type.
//!
//! Lists are written whole as `Arc<Vec<T>>`; the new value is built before it
//! is swapped in. When a [`CacheDb`] is attached, default lists are mirrored to
//! SQLite and restored on a memory miss while still within the TTL.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use super::connection::CacheDb;
use super::timed::TimedCache;
use crate::Error;
use crate::model::{CatalogEntity, Category, Collection, EntityType, Product};

/// A cached list for one entity type.
#[derive(Debug, Clone)]
pub enum CachedSet {
    Categories(Arc<Vec<Category>>),
    Products(Arc<Vec<Product>>),
    Collections(Arc<Vec<Collection>>),
}

impl CachedSet {
    pub fn entity_type(&self) -> EntityType {
        match self {
            CachedSet::Categories(_) => EntityType::Category,
            CachedSet::Products(_) => EntityType::Product,
            CachedSet::Collections(_) => EntityType::Collection,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CachedSet::Categories(items) => items.len(),
            CachedSet::Products(items) => items.len(),
            CachedSet::Collections(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entities that can live in a [`CatalogCache`].
pub trait CachedEntity: CatalogEntity {
    fn wrap(items: Arc<Vec<Self>>) -> CachedSet;

    fn unwrap(set: CachedSet) -> Option<Arc<Vec<Self>>>;

    fn index(cache: &CatalogCache) -> &TimedCache<String, Self>;
}

impl CachedEntity for Category {
    fn wrap(items: Arc<Vec<Self>>) -> CachedSet {
        CachedSet::Categories(items)
    }

    fn unwrap(set: CachedSet) -> Option<Arc<Vec<Self>>> {
        match set {
            CachedSet::Categories(items) => Some(items),
            _ => None,
        }
    }

    fn index(cache: &CatalogCache) -> &TimedCache<String, Self> {
        &cache.categories
    }
}

impl CachedEntity for Product {
    fn wrap(items: Arc<Vec<Self>>) -> CachedSet {
        CachedSet::Products(items)
    }

    fn unwrap(set: CachedSet) -> Option<Arc<Vec<Self>>> {
        match set {
            CachedSet::Products(items) => Some(items),
            _ => None,
        }
    }

    fn index(cache: &CatalogCache) -> &TimedCache<String, Self> {
        &cache.products
    }
}

impl CachedEntity for Collection {
    fn wrap(items: Arc<Vec<Self>>) -> CachedSet {
        CachedSet::Collections(items)
    }

    fn unwrap(set: CachedSet) -> Option<Arc<Vec<Self>>> {
        match set {
            CachedSet::Collections(items) => Some(items),
            _ => None,
        }
    }

    fn index(cache: &CatalogCache) -> &TimedCache<String, Self> {
        &cache.collections
    }
}

/// Shared cache state for the catalog.
#[derive(Debug)]
pub struct CatalogCache {
    lists: TimedCache<EntityType, CachedSet>,
    categories: TimedCache<String, Category>,
    products: TimedCache<String, Product>,
    collections: TimedCache<String, Collection>,
    db: Option<CacheDb>,
}

impl CatalogCache {
    /// Memory-only cache.
    pub fn new(ttl: Duration) -> Self {
        Self {
            lists: TimedCache::new(ttl),
            categories: TimedCache::new(ttl),
            products: TimedCache::new(ttl),
            collections: TimedCache::new(ttl),
            db: None,
        }
    }

    /// Cache that mirrors default lists to `db`.
    pub fn with_persistence(ttl: Duration, db: CacheDb) -> Self {
        Self { db: Some(db), ..Self::new(ttl) }
    }

    pub fn ttl(&self) -> Duration {
        self.lists.ttl()
    }

    pub fn db(&self) -> Option<&CacheDb> {
        self.db.as_ref()
    }

    /// The cached list for `T`, if one is still valid.
    pub async fn list<T: CachedEntity>(&self) -> Option<Arc<Vec<T>>> {
        if let Some(set) = self.lists.get(&T::KIND).await {
            tracing::debug!("cache hit for {} list", T::KIND);
            return T::unwrap(set);
        }
        self.restore::<T>().await
    }

    /// Whether a valid list for `entity` is held in memory.
    pub async fn has_list(&self, entity: EntityType) -> bool {
        self.lists.get(&entity).await.is_some()
    }

    /// Replace the list for `T` and rebuild its id index.
    pub async fn store_list<T: CachedEntity>(&self, items: Vec<T>) -> Arc<Vec<T>> {
        let items = Arc::new(items);

        T::index(self)
            .replace_all(items.iter().map(|item| (item.id().to_string(), item.clone())))
            .await;
        self.lists.set(T::KIND, T::wrap(Arc::clone(&items))).await;

        if let Some(db) = &self.db {
            let persisted = match serde_json::to_string(items.as_slice()) {
                Ok(json) => db.put_entry(T::KIND.as_str(), &json).await,
                Err(e) => Err(Error::from(e)),
            };
            if let Err(e) = persisted {
                tracing::warn!(entity = %T::KIND, error = %e, "failed to persist catalog list");
            }
        }

        items
    }

    /// Look an entity up in the id index.
    pub async fn lookup<T: CachedEntity>(&self, id: &str) -> Option<T> {
        T::index(self).get(&id.to_string()).await
    }

    /// Merge a single entity into the id index without touching the list.
    pub async fn remember<T: CachedEntity>(&self, item: T) {
        T::index(self).set(item.id().to_string(), item).await;
    }

    /// Merge entities into the id index without touching the list.
    pub async fn remember_all<T: CachedEntity>(&self, items: &[T]) {
        let index = T::index(self);
        for item in items {
            index.set(item.id().to_string(), item.clone()).await;
        }
    }

    /// Drop the list, the id index and the persisted copy for `entity`.
    ///
    /// Idempotent.
    pub async fn invalidate(&self, entity: EntityType) {
        self.lists.clear(&entity).await;
        match entity {
            EntityType::Category => self.categories.clear_all().await,
            EntityType::Product => self.products.clear_all().await,
            EntityType::Collection => self.collections.clear_all().await,
        }

        if let Some(db) = &self.db
            && let Err(e) = db.delete_entry(entity.as_str()).await
        {
            tracing::warn!(entity = %entity, error = %e, "failed to delete persisted catalog list");
        }

        tracing::debug!("invalidated {} cache", entity);
    }

    pub async fn invalidate_all(&self) {
        for entity in EntityType::ALL {
            self.invalidate(entity).await;
        }
    }

    async fn restore<T: CachedEntity>(&self) -> Option<Arc<Vec<T>>> {
        let db = self.db.as_ref()?;
        let key = T::KIND.as_str();

        let entry = match db.get_entry(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(entity = %T::KIND, error = %e, "failed to read persisted catalog list");
                return None;
            }
        };

        let age = entry.age();
        if age >= self.ttl() {
            tracing::debug!("persisted {} list expired ({:?} old)", T::KIND, age);
            self.discard(db, key).await;
            return None;
        }

        let items: Vec<T> = match serde_json::from_str(&entry.payload_json) {
            Ok(items) => items,
            Err(e) => {
                let err = Error::from(e);
                tracing::warn!(entity = %T::KIND, error = %err, "discarding corrupted persisted catalog list");
                self.discard(db, key).await;
                return None;
            }
        };

        let written_at = Instant::now().checked_sub(age).unwrap_or_else(Instant::now);
        let items = Arc::new(items);
        T::index(self)
            .replace_all_written_at(items.iter().map(|item| (item.id().to_string(), item.clone())), written_at)
            .await;
        self.lists
            .set_written_at(T::KIND, T::wrap(Arc::clone(&items)), written_at)
            .await;

        tracing::debug!("restored {} {} entries from local database", items.len(), T::KIND);
        Some(items)
    }

    async fn discard(&self, db: &CacheDb, key: &str) {
        if let Err(e) = db.delete_entry(key).await {
            tracing::warn!(key, error = %e, "failed to delete persisted catalog list");
        }
    }
}
