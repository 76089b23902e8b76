//! Cache store implementation
//!
//! In-memory map with per-entry TTL, ETag generation and insertion-order
//! eviction. Expiry is checked lazily on read and by a periodic sweep.

use super::{CacheConfig, CacheKey, TtlClass};
use crate::types::Result;
use bytes::Bytes;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// A cached entry with metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Serialized JSON body
    pub data: Bytes,
    /// ETag for HTTP caching (SHA256 of data)
    pub etag: String,
    /// When this entry was created
    pub created_at: Instant,
    /// When this entry expires
    pub expires_at: Instant,
    /// Insertion sequence, smallest is evicted first
    seq: u64,
}

impl CacheEntry {
    fn new(data: Bytes, ttl: Duration, seq: u64) -> Self {
        let etag = Self::compute_etag(&data);
        let now = Instant::now();
        Self {
            data,
            etag,
            created_at: now,
            expires_at: now + ttl,
            seq,
        }
    }

    /// Compute ETag from data using SHA256
    fn compute_etag(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let hash = hasher.finalize();
        format!("\"{}\"", hex::encode(&hash[..16]))
    }

    /// Check if this entry has expired
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Get remaining TTL in seconds
    pub fn remaining_ttl_secs(&self) -> u64 {
        self.expires_at
            .saturating_duration_since(Instant::now())
            .as_secs()
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit rate as percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Bounded result cache shared by all requests
pub struct ResultCache {
    /// storage_key -> entry
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
    next_seq: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            next_seq: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get a live entry; an expired one is removed and reported as a miss
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let storage_key = key.to_storage_key();

        if let Some(entry) = self.entries.get(&storage_key) {
            if !entry.is_expired() {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %storage_key, "Cache hit");
                return Some(entry.clone());
            }
            drop(entry);
            self.entries.remove_if(&storage_key, |_, e| e.is_expired());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %storage_key, "Cache miss");
        None
    }

    /// Whether a live entry exists (does not touch hit/miss counters)
    pub fn has(&self, key: &CacheKey) -> bool {
        let storage_key = key.to_storage_key();
        let live = match self.entries.get(&storage_key) {
            Some(entry) => !entry.is_expired(),
            None => return false,
        };
        if !live {
            self.entries.remove_if(&storage_key, |_, e| e.is_expired());
        }
        live
    }

    /// Store `data` under the TTL of `class`
    pub fn set(&self, key: &CacheKey, data: impl Into<Bytes>, class: TtlClass) -> CacheEntry {
        self.set_with_ttl(key, data, self.config.ttl_for(class))
    }

    /// Store `data` with an explicit TTL.
    ///
    /// Expired entries are purged first; if the cache is still full and the
    /// key is new, the oldest-inserted entry is evicted.
    pub fn set_with_ttl(&self, key: &CacheKey, data: impl Into<Bytes>, ttl: Duration) -> CacheEntry {
        let storage_key = key.to_storage_key();

        self.cleanup();
        if !self.entries.contains_key(&storage_key) && self.entries.len() >= self.config.max_entries {
            self.evict_oldest();
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry::new(data.into(), ttl, seq);
        debug!(key = %storage_key, ttl_secs = ttl.as_secs(), "Cache set");
        self.entries.insert(storage_key, entry.clone());
        entry
    }

    /// Return the cached entry or compute, store and return a fresh one.
    ///
    /// Concurrent misses on the same key may both compute; the later insert
    /// wins.
    pub fn get_or_insert_with<F>(&self, key: &CacheKey, class: TtlClass, compute: F) -> Result<CacheEntry>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        if let Some(entry) = self.get(key) {
            return Ok(entry);
        }
        let data = compute()?;
        Ok(self.set(key, data, class))
    }

    /// Remove an entry from the cache
    pub fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries
            .remove(&key.to_storage_key())
            .map(|(_, entry)| entry)
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().seq)
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Evicted oldest cache entry");
        }
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.clear();
        info!("Cache cleared");
    }

    /// Remove expired entries
    pub fn cleanup(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(count = removed, "Removed expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Start the periodic expiry sweep
pub fn spawn_cleanup_task(cache: Arc<ResultCache>) -> tokio::task::JoinHandle<()> {
    let period = cache.config.cleanup_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = cache.cleanup();
            if removed > 0 {
                debug!(removed, remaining = cache.len(), "Cache cleanup sweep");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> CacheKey {
        CacheKey::generate("test", [("k", vec![name.to_string()])])
    }

    fn small_cache(max_entries: usize) -> ResultCache {
        ResultCache::new(CacheConfig {
            max_entries,
            ..Default::default()
        })
    }

    #[test]
    fn test_set_get_has() {
        let cache = ResultCache::with_defaults();
        let k = key("a");

        assert!(!cache.has(&k));
        assert!(cache.get(&k).is_none());

        cache.set(&k, b"[1,2]".to_vec(), TtlClass::Filtered);
        assert!(cache.has(&k));
        let entry = cache.get(&k).unwrap();
        assert_eq!(&entry.data[..], b"[1,2]");
        assert!(entry.etag.starts_with('"'));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_evicts_oldest_inserted_not_least_used() {
        let cache = small_cache(2);
        cache.set(&key("a"), "a", TtlClass::Static);
        cache.set(&key("b"), "b", TtlClass::Static);

        // Reading "a" does not protect it
        assert!(cache.get(&key("a")).is_some());

        cache.set(&key("c"), "c", TtlClass::Static);
        assert_eq!(cache.len(), 2);
        assert!(!cache.has(&key("a")));
        assert!(cache.has(&key("b")));
        assert!(cache.has(&key("c")));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let cache = small_cache(2);
        cache.set(&key("a"), "a1", TtlClass::Static);
        cache.set(&key("b"), "b", TtlClass::Static);
        cache.set(&key("a"), "a2", TtlClass::Static);

        assert_eq!(cache.len(), 2);
        assert_eq!(&cache.get(&key("a")).unwrap().data[..], b"a2");
        assert_eq!(cache.stats().evictions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = ResultCache::with_defaults();
        let k = key("graph");
        cache.set(&k, "{}", TtlClass::Graph);

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(&k).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(&k).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_purges_expired_before_evicting() {
        let cache = small_cache(2);
        cache.set(&key("short"), "x", TtlClass::Filtered);
        cache.set(&key("long"), "y", TtlClass::Static);

        tokio::time::advance(Duration::from_secs(121)).await;
        cache.set(&key("new"), "z", TtlClass::Filtered);

        assert!(cache.has(&key("long")));
        assert!(cache.has(&key("new")));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_get_or_insert_with_computes_once() {
        let cache = ResultCache::with_defaults();
        let k = key("lazy");
        let mut calls = 0;

        for _ in 0..3 {
            let entry = cache
                .get_or_insert_with(&k, TtlClass::Filtered, || {
                    calls += 1;
                    Ok(b"[]".to_vec())
                })
                .unwrap();
            assert_eq!(&entry.data[..], b"[]");
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_get_or_insert_with_propagates_error() {
        let cache = ResultCache::with_defaults();
        let result = cache.get_or_insert_with(&key("err"), TtlClass::Filtered, || {
            Err(crate::types::CatalogError::Database("boom".into()))
        });
        assert!(result.is_err());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_sweeps() {
        let cache = Arc::new(ResultCache::new(CacheConfig {
            cleanup_interval: Duration::from_secs(10),
            ..Default::default()
        }));
        cache.set_with_ttl(&key("a"), "a", Duration::from_secs(5));

        let handle = spawn_cleanup_task(cache.clone());
        tokio::time::sleep(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;

        assert_eq!(cache.len(), 0);
        handle.abort();
    }
}
