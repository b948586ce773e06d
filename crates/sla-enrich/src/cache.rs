//! Keyed cache with coalesced fills.
//!
//! Each key maps to a once-initialized cell. The outer map lock is held
//! only long enough to find or insert the cell, so a slow fill for one key
//! never blocks lookups of another. Concurrent callers for the same key
//! wait on the same cell and observe a single fill.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};

pub struct CoalescingCache<K, V> {
    entries: RwLock<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> CoalescingCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn cell(&self, key: &K) -> Arc<OnceCell<V>> {
        if let Some(cell) = self.entries.read().await.get(key) {
            return cell.clone();
        }
        self.entries
            .write()
            .await
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Return the cached value for `key`, running `fill` on a miss.
    ///
    /// A failed fill leaves the entry empty: the error goes to this caller
    /// and the next caller runs its own fill.
    pub async fn get_or_try_fill<F, Fut, E>(&self, key: &K, fill: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = self.cell(key).await;
        cell.get_or_try_init(fill).await.cloned()
    }

    /// Cached value for `key`, if filled.
    pub async fn get(&self, key: &K) -> Option<V> {
        self.entries
            .read()
            .await
            .get(key)
            .and_then(|cell| cell.get().cloned())
    }

    /// Drop one entry so the next lookup refills it.
    pub async fn invalidate(&self, key: &K) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of filled entries.
    pub async fn len(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<K, V> Default for CoalescingCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
