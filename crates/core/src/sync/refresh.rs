//! Delayed refresh callbacks driven by data-updated events.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;

use super::broadcaster::DataUpdated;
use crate::model::EntityType;

/// Default pause between an invalidation and the refresh it triggers.
pub const DEFAULT_REFRESH_DELAY: Duration = Duration::from_millis(500);

pub type RefreshCallback = Arc<dyn Fn(EntityType) + Send + Sync>;

/// Runs registered callbacks a fixed delay after each data-updated event.
///
/// Callbacks for the same event run in registration order, but no ordering is
/// guaranteed across events.
#[derive(Clone)]
pub struct RefreshBinder {
    delay: Duration,
    callbacks: Arc<RwLock<HashMap<EntityType, Vec<RefreshCallback>>>>,
}

impl std::fmt::Debug for RefreshBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshBinder").field("delay", &self.delay).finish_non_exhaustive()
    }
}

impl RefreshBinder {
    pub fn new(delay: Duration) -> Self {
        Self { delay, callbacks: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Register `callback` for updates to `entity`.
    pub async fn on_data_updated<F>(&self, entity: EntityType, callback: F)
    where
        F: Fn(EntityType) + Send + Sync + 'static,
    {
        self.callbacks.write().await.entry(entity).or_default().push(Arc::new(callback));
    }

    /// Drive callbacks from `updates` until the sender side closes.
    ///
    /// Each event is handled on its own task so one delay does not hold back
    /// the next event.
    pub fn spawn(&self, mut updates: broadcast::Receiver<DataUpdated>) -> JoinHandle<()> {
        let binder = self.clone();

        tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(update) => binder.schedule(vec![update.entity_type]),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "refresh binder lagged, refreshing every entity type");
                        binder.schedule(EntityType::ALL.to_vec());
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn schedule(&self, entities: Vec<EntityType>) {
        let binder = self.clone();

        tokio::spawn(async move {
            if !binder.delay.is_zero() {
                tokio::time::sleep(binder.delay).await;
            }
            for entity in entities {
                binder.run(entity).await;
            }
        });
    }

    async fn run(&self, entity: EntityType) {
        let callbacks = match self.callbacks.read().await.get(&entity) {
            Some(callbacks) => callbacks.clone(),
            None => return,
        };

        tracing::debug!("running {} refresh callbacks for {}", callbacks.len(), entity);
        for callback in callbacks {
            callback(entity);
        }
    }
}

impl Default for RefreshBinder {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_DELAY)
    }
}
