//! In-memory key/value cache with a fixed time-to-live.
//!
//! Validity is decided lazily on read: an entry older than the TTL is evicted
//! by the `get` that observes it. Entries are only ever replaced whole.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

/// Default validity window (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// A cached value with the instant it was written.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub payload: V,
    pub written_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_valid(&self, ttl: Duration) -> bool {
        self.written_at.elapsed() < ttl
    }
}

/// Per-key store with a last-write timestamp and a fixed TTL.
///
/// Unbounded: the keyspace is expected to be small and fixed.
#[derive(Debug)]
pub struct TimedCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
}

impl<K, V> TimedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `value` under `key` stamped with the current instant.
    pub async fn set(&self, key: K, value: V) {
        self.set_written_at(key, value, Instant::now()).await;
    }

    /// Store `value` with an explicit write instant.
    ///
    /// Used when restoring entries whose age is known from elsewhere.
    pub async fn set_written_at(&self, key: K, value: V, written_at: Instant) {
        let mut entries = self.entries.write().await;
        entries.insert(key, CacheEntry { payload: value, written_at });
    }

    /// Replace every entry at once with the given pairs.
    pub async fn replace_all(&self, items: impl IntoIterator<Item = (K, V)>) {
        self.replace_all_written_at(items, Instant::now()).await;
    }

    /// Replace every entry at once, stamping all of them with `written_at`.
    ///
    /// The new map is built before the lock is taken, so readers see either
    /// the old contents or the new ones.
    pub async fn replace_all_written_at(&self, items: impl IntoIterator<Item = (K, V)>, written_at: Instant) {
        let fresh: HashMap<K, CacheEntry<V>> =
            items.into_iter().map(|(k, v)| (k, CacheEntry { payload: v, written_at })).collect();
        *self.entries.write().await = fresh;
    }

    /// Return the value for `key` if it was written less than one TTL ago.
    ///
    /// A stale entry is removed before returning `None`.
    pub async fn get(&self, key: &K) -> Option<V> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.is_valid(self.ttl) => return Some(entry.payload.clone()),
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.is_valid(self.ttl) => Some(entry.payload.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Remove `key`. Clearing an absent key is a no-op.
    pub async fn clear(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    pub async fn clear_all(&self) {
        self.entries.write().await.clear();
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid(self.ttl));
        before - entries.len()
    }

    /// Number of stored entries, including stale ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Valid values, in no particular order.
    pub async fn values(&self) -> Vec<V> {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|entry| entry.is_valid(self.ttl))
            .map(|entry| entry.payload.clone())
            .collect()
    }
}

impl<K, V> Default for TimedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
