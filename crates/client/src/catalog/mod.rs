//! Cached catalog reads.
//!
//! [`CatalogStore`] answers list and lookup requests from the shared
//! [`CatalogCache`] and falls back to the API on a miss. Unfiltered list
//! results are cached; filtered or searched ones never are.
//!
//! The read path never fails outright: fetch and decode errors are logged and
//! turned into an empty list or `None`. The `try_*` variants expose the
//! underlying error for callers that need it.

pub mod admin;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use storefront_core::Error;
use storefront_core::cache::{CachedEntity, CatalogCache};
use storefront_core::model::{
    Category, CategoryTree, Collection, EntityType, Hierarchy, Product, UNCATEGORIZED, build_hierarchy, build_tree,
    product_counts,
};

use crate::fetch::RemoteFetcher;

pub use admin::CatalogAdmin;

/// Filters accepted by the list endpoints.
///
/// The default query (no filters, no search, not forced) is the only one
/// served from cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Bypass the cache even for an unfiltered list.
    pub force: bool,
    pub category: Option<String>,
    pub trending: Option<bool>,
    pub best_seller: Option<bool>,
    pub new_arrival: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListQuery {
    /// An unfiltered query that skips the cache and refreshes it.
    pub fn forced() -> Self {
        Self { force: true, ..Default::default() }
    }

    /// Whether any filter, search term or page bound is set.
    pub fn is_filtered(&self) -> bool {
        self.category.is_some()
            || self.trending.is_some()
            || self.best_seller.is_some()
            || self.new_arrival.is_some()
            || self.search.as_deref().is_some_and(|s| !s.trim().is_empty())
            || self.limit.is_some()
            || self.offset.is_some()
    }

    pub fn is_default(&self) -> bool {
        !self.force && !self.is_filtered()
    }

    /// Query string pairs in the API's parameter names.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |name: &str, value: String| pairs.push((name.to_string(), value));

        if let Some(category) = &self.category {
            push("category", category.clone());
        }
        if let Some(trending) = self.trending {
            push("trending", trending.to_string());
        }
        if let Some(best_seller) = self.best_seller {
            push("best_seller", best_seller.to_string());
        }
        if let Some(new_arrival) = self.new_arrival {
            push("new_arrival", new_arrival.to_string());
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            push("search", search.to_string());
        }
        if let Some(limit) = self.limit {
            push("limit", limit.to_string());
        }
        if let Some(offset) = self.offset {
            push("offset", offset.to_string());
        }
        pairs
    }
}

/// Read side of the catalog.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    fetcher: RemoteFetcher,
    cache: Arc<CatalogCache>,
}

impl CatalogStore {
    pub fn new(fetcher: RemoteFetcher, cache: Arc<CatalogCache>) -> Self {
        Self { fetcher, cache }
    }

    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    pub fn fetcher(&self) -> &RemoteFetcher {
        &self.fetcher
    }

    /// All entities of type `T` matching `query`, or an empty list on failure.
    pub async fn load_all<T: CachedEntity>(&self, query: &ListQuery) -> Arc<Vec<T>> {
        match self.try_load_all::<T>(query).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(entity = %T::KIND, error = %e, "failed to load catalog list, using empty fallback");
                Arc::new(Vec::new())
            }
        }
    }

    /// Like [`load_all`](Self::load_all) but surfaces the failure.
    pub async fn try_load_all<T: CachedEntity>(&self, query: &ListQuery) -> Result<Arc<Vec<T>>, Error> {
        if query.is_default()
            && let Some(items) = self.cache.list::<T>().await
        {
            return Ok(items);
        }

        tracing::debug!("fetching {} list (filtered: {}, forced: {})", T::KIND, query.is_filtered(), query.force);
        let value = self
            .fetcher
            .get_with_query(&T::KIND.api_path(), query.query_pairs())
            .await?;
        let items = decode_list::<T>(value)?;

        if query.is_filtered() {
            self.cache.remember_all(&items).await;
            Ok(Arc::new(items))
        } else {
            Ok(self.cache.store_list(items).await)
        }
    }

    /// A single entity by id, or `None` when missing or on failure.
    pub async fn get_by_id<T: CachedEntity>(&self, id: &str) -> Option<T> {
        match self.try_get_by_id::<T>(id).await {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(entity = %T::KIND, id, error = %e, "failed to load catalog entity");
                None
            }
        }
    }

    /// Like [`get_by_id`](Self::get_by_id) but surfaces the failure.
    ///
    /// A 404 from the API is `Ok(None)`.
    pub async fn try_get_by_id<T: CachedEntity>(&self, id: &str) -> Result<Option<T>, Error> {
        let id = id.trim();
        let path = entity_path(T::KIND, id)?;

        if let Some(item) = self.cache.lookup::<T>(id).await {
            return Ok(Some(item));
        }

        let value = match self.fetcher.get(&path).await {
            Ok(Value::Null) => return Ok(None),
            Ok(value) => value,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let item: T = serde_json::from_value(value)?;
        self.cache.remember(item.clone()).await;
        Ok(Some(item))
    }

    /// First entity of type `T` whose slug equals `slug`.
    pub async fn get_by_slug<T: CachedEntity>(&self, slug: &str) -> Option<T> {
        self.load_all::<T>(&ListQuery::default())
            .await
            .iter()
            .find(|item| item.slug().is_some_and(|s| s.eq_ignore_ascii_case(slug)))
            .cloned()
    }

    /// `parent_id -> [child_id]` over the current category list.
    pub async fn hierarchy(&self) -> Hierarchy {
        build_hierarchy(&self.load_all::<Category>(&ListQuery::default()).await)
    }

    /// Nested category tree; cycles are broken and reported.
    pub async fn category_tree(&self) -> CategoryTree {
        build_tree(&self.load_all::<Category>(&ListQuery::default()).await)
    }

    /// Display name of a product's category, or [`UNCATEGORIZED`].
    pub async fn category_label(&self, product: &Product) -> String {
        if let Some(name) = product.category_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }

        let Some(category_id) = product.category_id.as_deref() else {
            return UNCATEGORIZED.to_string();
        };

        if let Some(category) = self.cache.lookup::<Category>(category_id).await {
            return category.name;
        }

        self.load_all::<Category>(&ListQuery::default())
            .await
            .iter()
            .find(|c| c.id == category_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| UNCATEGORIZED.to_string())
    }

    /// Number of products per category id.
    pub async fn category_product_counts(&self) -> HashMap<String, usize> {
        product_counts(&self.load_all::<Product>(&ListQuery::default()).await)
    }

    /// Reload the default list for `entity`. Returns the number of entries.
    pub async fn warm(&self, entity: EntityType) -> usize {
        match entity {
            EntityType::Category => self.load_all::<Category>(&ListQuery::default()).await.len(),
            EntityType::Product => self.load_all::<Product>(&ListQuery::default()).await.len(),
            EntityType::Collection => self.load_all::<Collection>(&ListQuery::default()).await.len(),
        }
    }
}

/// `/api/<plural>/<id>` for a single entity.
///
/// Ids are inserted as one path segment; anything that would change the
/// request target is rejected rather than escaped.
pub(crate) fn entity_path(entity: EntityType, id: &str) -> Result<String, Error> {
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::InvalidInput(format!("{entity} id must not be empty")));
    }
    if id == "." || id == ".." || id.contains(['/', '\\', '?', '#', '%']) || id.chars().any(char::is_control) {
        return Err(Error::InvalidInput(format!("{entity} id {id:?} is not a valid path segment")));
    }
    Ok(format!("{}/{}", entity.api_path(), id))
}

/// Decode a list payload, skipping entries that do not fit `T`.
fn decode_list<T: CachedEntity>(value: Value) -> Result<Vec<T>, Error> {
    let Value::Array(entries) = value else {
        return Err(Error::InvalidPayload(format!("{} response is not an array", T::KIND.plural())));
    };

    let total = entries.len();
    let items: Vec<T> = entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<T>(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(entity = %T::KIND, error = %e, "skipping malformed catalog entry");
                None
            }
        })
        .collect();

    if items.len() < total {
        tracing::debug!("decoded {} of {} {}", items.len(), total, T::KIND.plural());
    }
    Ok(items)
}
