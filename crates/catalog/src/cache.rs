//! TTL cache for catalog reads.
//!
//! Backed by `moka`, which timestamps every entry on insertion and stops
//! returning it once the TTL has elapsed. Expired entries are reclaimed lazily;
//! once the cache grows past its sweep threshold, the next insert purges them
//! first. There is no background timer.
//!
//! The cache is an optimization only. Nothing here can fail, and callers only
//! insert values produced by successful reads.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use dram_core::CatalogItem;

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    /// A product looked up by the slug the caller asked for.
    Product(String),
    /// A listing, optionally narrowed by a normalized search query.
    Products { search: Option<String> },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<CatalogItem>),
    Products(Arc<[CatalogItem]>),
}

/// Key-value store with per-entry expiry and a soft capacity.
#[derive(Clone)]
pub struct TtlCache<K, V> {
    inner: Cache<K, V>,
    ttl: Duration,
    sweep_threshold: u64,
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache whose entries live for `ttl` after insertion.
    ///
    /// Inserting while more than `sweep_threshold` entries are held purges
    /// expired entries before the insert.
    #[must_use]
    pub fn new(ttl: Duration, sweep_threshold: u64) -> Self {
        let inner = Cache::builder().time_to_live(ttl).build();

        Self {
            inner,
            ttl,
            sweep_threshold,
        }
    }

    /// Get a live entry. Expired entries behave as a miss.
    pub async fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).await
    }

    /// Insert or wholesale replace an entry.
    pub async fn set(&self, key: K, value: V) {
        if self.inner.entry_count() > self.sweep_threshold {
            self.inner.run_pending_tasks().await;
            debug!(
                entries = self.inner.entry_count(),
                threshold = self.sweep_threshold,
                "Swept expired cache entries"
            );
        }

        self.inner.insert(key, value).await;
    }

    /// Remove one entry.
    pub async fn invalidate(&self, key: &K) {
        self.inner.invalidate(key).await;
    }

    /// Remove entries matching a predicate.
    pub async fn invalidate_where(&self, predicate: impl Fn(&K) -> bool) {
        let keys: Vec<Arc<K>> = self
            .inner
            .iter()
            .filter(|(key, _)| predicate(key.as_ref()))
            .map(|(key, _)| key)
            .collect();

        for key in keys {
            self.inner.invalidate(key.as_ref()).await;
        }
    }

    /// Remove every entry.
    pub async fn invalidate_all(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }

    /// Approximate number of entries held, including not-yet-reclaimed expired ones.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Apply pending maintenance (expiry, invalidation) immediately.
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}
