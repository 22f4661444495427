//! Read-through TTL cache for analytics queries.
//!
//! Entries carry their own expiry and are checked on every read; an expired
//! entry is never served. Capacity is bounded: inserting a new key into a full
//! cache evicts the entry that was inserted first.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    /// `None` when `now + ttl` is past what `Instant` can represent.
    expires_at: Option<Instant>,
    /// Insertion order, used to pick the eviction victim.
    seq: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug)]
pub struct AnalyticsCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
    capacity: usize,
    next_seq: AtomicU64,
}

impl<V: Clone> AnalyticsCache<V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fresh value for `key`, if any. Expired entries are dropped on the way.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.is_expired(now) {
                return Some(entry.value.clone());
            }
        }
        self.entries
            .remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_at(key.into(), value, Instant::now());
    }

    fn insert_at(&self, key: String, value: V, now: Instant) {
        if !self.entries.contains_key(&key) {
            self.make_room(now);
        }
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now.checked_add(self.ttl),
                seq,
            },
        );
    }

    /// Return the cached value for `key` or compute, store and return it.
    ///
    /// Errors from `compute` are returned as-is and nothing is cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key) {
            tracing::debug!(cache_key = key, "analytics cache hit");
            return Ok(hit);
        }
        tracing::debug!(cache_key = key, "analytics cache miss");
        let value = compute().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    fn make_room(&self, now: Instant) {
        if self.entries.len() < self.capacity {
            return;
        }
        self.entries.retain(|_, entry| !entry.is_expired(now));
        while self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().seq)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    tracing::debug!(cache_key = %key, "evicted oldest analytics cache entry");
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entries_are_served() {
        let cache = AnalyticsCache::new(Duration::from_secs(60), 4);
        cache.insert("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn expired_entries_are_not_served() {
        let cache = AnalyticsCache::new(Duration::from_secs(10), 4);
        let start = Instant::now();
        cache.insert_at("a".to_string(), 1, start);

        assert_eq!(cache.get_at("a", start + Duration::from_secs(9)), Some(1));
        assert_eq!(cache.get_at("a", start + Duration::from_secs(10)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn full_cache_evicts_oldest_insert() {
        let cache = AnalyticsCache::new(Duration::from_secs(60), 2);
        cache.insert("first", 1);
        cache.insert("second", 2);
        cache.insert("third", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("first"), None);
        assert_eq!(cache.get("second"), Some(2));
        assert_eq!(cache.get("third"), Some(3));
    }

    #[test]
    fn overwriting_a_key_does_not_evict() {
        let cache = AnalyticsCache::new(Duration::from_secs(60), 2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);

        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn expired_entries_make_room_before_live_ones() {
        let cache = AnalyticsCache::new(Duration::from_secs(10), 2);
        let start = Instant::now();
        cache.insert_at("stale".to_string(), 1, start);
        cache.insert_at("live".to_string(), 2, start + Duration::from_secs(5));
        cache.insert_at("new".to_string(), 3, start + Duration::from_secs(11));

        let later = start + Duration::from_secs(12);
        assert_eq!(cache.get_at("live", later), Some(2));
        assert_eq!(cache.get_at("new", later), Some(3));
    }

    #[test]
    fn unrepresentable_expiry_never_expires() {
        let cache = AnalyticsCache::new(Duration::from_secs(u64::MAX), 4);
        let start = Instant::now();
        cache.insert_at("a".to_string(), 1, start);
        assert_eq!(cache.get_at("a", start + Duration::from_secs(3600)), Some(1));
    }

    #[tokio::test]
    async fn read_through_computes_once_while_fresh() {
        let cache = AnalyticsCache::new(Duration::from_secs(60), 4);
        let calls = AtomicU64::new(0);

        for _ in 0..3 {
            let v: Result<u64, ()> = cache
                .get_or_try_insert_with("summary", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await;
            assert_eq!(v, Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_compute_is_not_cached() {
        let cache: AnalyticsCache<u64> = AnalyticsCache::new(Duration::from_secs(60), 4);
        let err = cache
            .get_or_try_insert_with("summary", || async { Err("db down") })
            .await;
        assert_eq!(err, Err("db down"));
        assert!(cache.is_empty());
    }
}
