//! Change broadcasting between catalog contexts.
//!
//! A context that mutates the catalog calls [`ChangeBroadcaster::notify`]; every
//! other context sharing the channel drops the affected cache entries when the
//! notification arrives. Both sides then emit [`DataUpdated`] events locally.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::channel::{CHANNEL_CAPACITY, ChangeChannel, ChannelEvent};
use crate::Error;
use crate::cache::CatalogCache;
use crate::model::{ChangeAction, ChangeNotification, EntityType};

static CONTEXT_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Where a data-updated event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateSource {
    Local,
    Remote,
}

/// Local signal that cached data for `entity_type` was invalidated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataUpdated {
    pub entity_type: EntityType,
    /// `None` when the event stems from a resync rather than a single change.
    pub action: Option<ChangeAction>,
    pub source: UpdateSource,
}

/// Publishes catalog changes and turns received ones into local invalidations.
pub struct ChangeBroadcaster {
    cache: Arc<CatalogCache>,
    channel: Arc<dyn ChangeChannel>,
    origin: String,
    updates: broadcast::Sender<DataUpdated>,
}

impl std::fmt::Debug for ChangeBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeBroadcaster").field("origin", &self.origin).finish_non_exhaustive()
    }
}

impl ChangeBroadcaster {
    pub fn new(cache: Arc<CatalogCache>, channel: Arc<dyn ChangeChannel>) -> Self {
        let origin = format!("{}-{}", std::process::id(), CONTEXT_COUNTER.fetch_add(1, Ordering::Relaxed));
        let (updates, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { cache, channel, origin, updates }
    }

    /// Identifier stamped on notifications published by this context.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    /// Subscribe to local data-updated events.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<DataUpdated> {
        self.updates.subscribe()
    }

    /// Record a catalog mutation made by this context.
    ///
    /// Drops the local cache entries for `entity` (and categories for a
    /// product change), publishes a notification, and emits data-updated
    /// events. Returns the entity types that were invalidated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Channel`] if the notification could not be published.
    /// Local invalidation and events happen regardless.
    pub async fn notify(
        &self, entity: EntityType, action: ChangeAction, payload: serde_json::Value,
    ) -> Result<Vec<EntityType>, Error> {
        let targets = self.invalidate(entity).await;

        let notification = ChangeNotification::new(entity, action, payload, &self.origin);
        let published = self.channel.publish(&notification).await;

        self.emit(&targets, Some(action), UpdateSource::Local);

        match published {
            Ok(()) => {
                tracing::info!("published {} {} notification", entity, action);
                Ok(targets)
            }
            Err(e @ Error::Channel(_)) => Err(e),
            Err(e) => Err(Error::Channel(e.to_string())),
        }
    }

    /// Handle a notification received from another context.
    ///
    /// Notifications carrying this context's own origin are ignored. Returns
    /// the entity types that were invalidated.
    pub async fn receive(&self, notification: &ChangeNotification) -> Vec<EntityType> {
        if notification.origin == self.origin {
            return Vec::new();
        }

        tracing::info!(
            origin = %notification.origin,
            "received {} {} notification",
            notification.entity_type,
            notification.action
        );

        let targets = self.invalidate(notification.entity_type).await;
        self.emit(&targets, Some(notification.action), UpdateSource::Remote);
        targets
    }

    /// Spawn the receiver loop for the shared channel.
    ///
    /// The subscription is taken before the task starts, so no notification
    /// published after this call is missed. The loop ends when the channel
    /// closes.
    pub fn listen(self: Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.channel.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ChannelEvent::Change(notification)) => {
                        self.receive(&notification).await;
                    }
                    Ok(ChannelEvent::Resync) => {
                        tracing::warn!("change channel lost notifications, invalidating entire catalog");
                        self.resync().await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "change listener lagged, invalidating entire catalog");
                        self.resync().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!("change channel closed, stopping listener");
                        break;
                    }
                }
            }
        })
    }

    async fn resync(&self) {
        self.cache.invalidate_all().await;
        self.emit(&EntityType::ALL, None, UpdateSource::Remote);
    }

    async fn invalidate(&self, entity: EntityType) -> Vec<EntityType> {
        let targets = entity.invalidation_targets().to_vec();
        for target in &targets {
            self.cache.invalidate(*target).await;
        }
        targets
    }

    fn emit(&self, targets: &[EntityType], action: Option<ChangeAction>, source: UpdateSource) {
        for entity_type in targets {
            // Nobody listening is fine.
            let _ = self.updates.send(DataUpdated { entity_type: *entity_type, action, source });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheDb;
    use crate::model::{Category, Collection, Product};
    use crate::sync::{MemoryChannel, SqliteChannel};
    use serde_json::json;
    use std::time::Duration;

    fn empty_cache() -> Arc<CatalogCache> {
        Arc::new(CatalogCache::new(Duration::from_secs(300)))
    }

    async fn seed(cache: &CatalogCache) {
        let categories: Vec<Category> = serde_json::from_value(json!([{"id": 1, "name": "Bags"}])).unwrap();
        let products: Vec<Product> = serde_json::from_value(json!([{"id": 7, "name": "Tote"}])).unwrap();
        let collections: Vec<Collection> = serde_json::from_value(json!([{"id": 2, "name": "Summer"}])).unwrap();
        cache.store_list(categories).await;
        cache.store_list(products).await;
        cache.store_list(collections).await;
    }

    async fn next_update(rx: &mut broadcast::Receiver<DataUpdated>) -> DataUpdated {
        tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_notify_invalidates_locally_with_cascade() {
        let cache = empty_cache();
        seed(&cache).await;
        let channel = Arc::new(MemoryChannel::new());
        let broadcaster = ChangeBroadcaster::new(cache.clone(), channel.clone());
        let mut updates = broadcaster.subscribe_updates();

        let targets = broadcaster
            .notify(EntityType::Product, ChangeAction::Update, json!({"id": "7"}))
            .await
            .unwrap();

        assert_eq!(targets, vec![EntityType::Product, EntityType::Category]);
        assert!(cache.list::<Product>().await.is_none());
        assert!(cache.list::<Category>().await.is_none());

        let latest = channel.latest().await.unwrap().unwrap();
        assert_eq!(latest.entity_type, EntityType::Product);
        assert_eq!(latest.origin, broadcaster.origin());

        let first = next_update(&mut updates).await;
        assert_eq!(first.entity_type, EntityType::Product);
        assert_eq!(first.source, UpdateSource::Local);
        assert_eq!(next_update(&mut updates).await.entity_type, EntityType::Category);
    }

    #[tokio::test]
    async fn test_collection_change_leaves_other_lists() {
        let cache = empty_cache();
        seed(&cache).await;
        let broadcaster = ChangeBroadcaster::new(cache.clone(), Arc::new(MemoryChannel::new()));

        broadcaster
            .notify(EntityType::Collection, ChangeAction::Create, json!({}))
            .await
            .unwrap();

        assert!(cache.list::<Product>().await.is_some());
        assert!(cache.list::<Category>().await.is_some());
    }

    #[tokio::test]
    async fn test_other_context_receives_invalidation() {
        let channel: Arc<dyn ChangeChannel> = Arc::new(MemoryChannel::new());

        let admin = ChangeBroadcaster::new(empty_cache(), channel.clone());
        let shop_cache = empty_cache();
        seed(&shop_cache).await;
        let shop = Arc::new(ChangeBroadcaster::new(shop_cache.clone(), channel));
        let mut updates = shop.subscribe_updates();
        let listener = shop.clone().listen();

        admin
            .notify(EntityType::Product, ChangeAction::Delete, json!({"id": "7"}))
            .await
            .unwrap();

        let update = next_update(&mut updates).await;
        assert_eq!(update.entity_type, EntityType::Product);
        assert_eq!(update.action, Some(ChangeAction::Delete));
        assert_eq!(update.source, UpdateSource::Remote);
        assert_eq!(next_update(&mut updates).await.entity_type, EntityType::Category);

        assert!(shop_cache.list::<Product>().await.is_none());
        assert!(shop_cache.list::<Category>().await.is_none());
        listener.abort();
    }

    #[tokio::test]
    async fn test_collapsed_sqlite_writes_invalidate_everything() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let admin_channel = SqliteChannel::start(db.clone(), Duration::from_secs(3600)).await.unwrap();
        let shop_channel = SqliteChannel::start(db, Duration::from_millis(200)).await.unwrap();

        let admin = ChangeBroadcaster::new(empty_cache(), Arc::new(admin_channel));
        let shop_cache = empty_cache();
        seed(&shop_cache).await;
        let shop = Arc::new(ChangeBroadcaster::new(shop_cache.clone(), Arc::new(shop_channel)));
        let mut updates = shop.subscribe_updates();
        let listener = shop.clone().listen();

        tokio::time::sleep(Duration::from_millis(50)).await;
        admin
            .notify(EntityType::Product, ChangeAction::Update, json!({"id": "7"}))
            .await
            .unwrap();
        admin
            .notify(EntityType::Collection, ChangeAction::Create, json!({"id": "3"}))
            .await
            .unwrap();

        let update = next_update(&mut updates).await;
        assert_eq!(update.action, None);
        assert_eq!(update.source, UpdateSource::Remote);

        assert!(shop_cache.list::<Product>().await.is_none());
        assert!(shop_cache.list::<Category>().await.is_none());
        assert!(shop_cache.list::<Collection>().await.is_none());
        listener.abort();
    }

    #[tokio::test]
    async fn test_own_echo_ignored() {
        let cache = empty_cache();
        let broadcaster = ChangeBroadcaster::new(cache.clone(), Arc::new(MemoryChannel::new()));

        let echo = ChangeNotification::new(EntityType::Product, ChangeAction::Update, json!({}), broadcaster.origin());
        seed(&cache).await;
        assert!(broadcaster.receive(&echo).await.is_empty());
        assert!(cache.list::<Product>().await.is_some());
    }

    #[tokio::test]
    async fn test_receive_is_idempotent() {
        let cache = empty_cache();
        seed(&cache).await;
        let broadcaster = ChangeBroadcaster::new(cache.clone(), Arc::new(MemoryChannel::new()));
        let remote = ChangeNotification::new(EntityType::Category, ChangeAction::Update, json!({}), "elsewhere");

        assert_eq!(broadcaster.receive(&remote).await, vec![EntityType::Category]);
        assert_eq!(broadcaster.receive(&remote).await, vec![EntityType::Category]);
        assert!(cache.list::<Category>().await.is_none());
        assert!(cache.list::<Product>().await.is_some());
    }

    #[test]
    fn test_origins_are_unique() {
        let a = ChangeBroadcaster::new(empty_cache(), Arc::new(MemoryChannel::new()));
        let b = ChangeBroadcaster::new(empty_cache(), Arc::new(MemoryChannel::new()));
        assert_ne!(a.origin(), b.origin());
    }
}
