//! Expiring contact-info cache.
//!
//! A bounded LRU map whose entries carry an expired flag instead of being
//! evicted on staleness: `expire_all` marks everything stale in place, so
//! the last known value is still available for immediate display while a
//! background refresh is requested. Eviction only happens on capacity.

use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

/// A cached value and its staleness flag.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expired: bool,
}

/// Bounded key→value cache distinguishing absent, expired and fresh
/// entries.
///
/// Shared between the render path (reads, occasional re-puts) and the
/// enrichment worker (writes). Every operation is a short critical
/// section under a non-poisoning mutex; nothing blocks on I/O.
pub struct ExpiringCache<K: Hash + Eq, V> {
    inner: Mutex<LruCache<K, CacheEntry<V>>>,
}

impl<K: Hash + Eq, V: Clone> ExpiringCache<K, V> {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        ExpiringCache {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The value for `key`, only if present and not expired.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut cache = self.inner.lock();
        match cache.get(key) {
            Some(entry) if !entry.expired => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// The value for `key` regardless of expiration, if present at all.
    pub fn get_possibly_expired<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut cache = self.inner.lock();
        cache.get(key).map(|entry| entry.value.clone())
    }

    /// The value and its expiration state, for the render path to decide
    /// whether a refresh should be requested.
    pub fn get_cached_value<Q>(&self, key: &Q) -> Option<(V, bool)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut cache = self.inner.lock();
        cache.get(key).map(|entry| (entry.value.clone(), entry.expired))
    }

    /// Insert or replace the value for `key`, clearing its expired flag.
    pub fn put(&self, key: K, value: V) {
        let mut cache = self.inner.lock();
        cache.put(key, CacheEntry { value, expired: false });
    }

    /// Mark every entry expired in place. Nothing is evicted or removed;
    /// stale values remain readable through the possibly-expired paths.
    pub fn expire_all(&self) {
        let mut cache = self.inner.lock();
        for (_, entry) in cache.iter_mut() {
            entry.expired = true;
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
