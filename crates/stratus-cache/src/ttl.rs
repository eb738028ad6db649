//! TTL + capacity bounded cache.
//!
//! Entries are evicted least-recently-used once the capacity is exceeded;
//! entries older than the TTL are treated as absent on read and removed.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

/// Default capacity for a cache constructed without explicit sizing.
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

/// Default TTL for a cache constructed without explicit sizing.
pub const DEFAULT_TTL: Duration = Duration::from_secs(2000);

/// Point-in-time statistics for one cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    /// Number of live entries (expired entries may still be counted until
    /// their next read).
    pub size: usize,
    /// Reads that returned a live entry.
    pub hit_count: u64,
    /// Reads that found nothing, or only an expired entry.
    pub miss_count: u64,
    /// `hit_count / (hit_count + miss_count)`, 0.0 before any read.
    pub hit_ratio: f64,
}

struct Entry<V> {
    value: V,
    inserted: Instant,
}

struct Inner<K: Hash + Eq, V> {
    entries: LruCache<K, Entry<V>>,
    hits: u64,
    misses: u64,
}

/// A named tier of the scrape engine's caching, e.g. the dimensions,
/// metrics, or tags cache.
pub struct TtlCache<K: Hash + Eq, V> {
    inner: Mutex<Inner<K, V>>,
    ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    /// Create a cache bounded to `max_entries` with the given TTL.
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(cap),
                hits: 0,
                misses: 0,
            }),
            ttl,
        }
    }

    /// Look up `key`, returning the value only while it is younger than the
    /// TTL. An expired entry is removed and counted as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let live = match inner.entries.get(key) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => Some(entry.value.clone()),
            _ => None,
        };
        match live {
            Some(value) => {
                inner.hits += 1;
                Some(value)
            }
            None => {
                // Drops an expired entry; a no-op when the key was absent.
                inner.entries.pop(key);
                inner.misses += 1;
                None
            }
        }
    }

    /// Insert `value` under `key`, evicting the least recently used entry if
    /// the cache is at capacity.
    pub fn put(&self, key: K, value: V) {
        let mut inner = self.inner.lock();
        inner.entries.put(
            key,
            Entry {
                value,
                inserted: Instant::now(),
            },
        );
    }

    /// Current size and hit/miss counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let total = inner.hits + inner.misses;
        CacheStats {
            size: inner.entries.len(),
            hit_count: inner.hits,
            miss_count: inner.misses,
            hit_ratio: if total == 0 {
                0.0
            } else {
                inner.hits as f64 / total as f64
            },
        }
    }
}

impl<K: Hash + Eq, V: Clone> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn miss_then_hit() {
        let cache: TtlCache<String, u32> = TtlCache::new(10, Duration::from_secs(60));
        assert_eq!(cache.get(&"a".to_string()), None);

        cache.put("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.size, 1);
    }

    #[test]
    fn put_overwrites() {
        let cache: TtlCache<String, u32> = TtlCache::new(10, Duration::from_secs(60));
        cache.put("a".to_string(), 1);
        cache.put("a".to_string(), 2);
        assert_eq!(cache.get(&"a".to_string()), Some(2));
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn entry_expires_after_ttl() {
        let cache: TtlCache<String, u32> = TtlCache::new(10, Duration::from_secs(2));
        cache.put("a".to_string(), 7);

        sleep(Duration::from_secs(1));
        assert_eq!(cache.get(&"a".to_string()), Some(7));

        sleep(Duration::from_secs(2));
        assert_eq!(cache.get(&"a".to_string()), None);
        // The expired entry is gone, not just hidden.
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache: TtlCache<u32, u32> = TtlCache::new(2, Duration::from_secs(60));
        cache.put(1, 10);
        cache.put(2, 20);
        // Touch 1 so 2 becomes the eviction candidate.
        assert_eq!(cache.get(&1), Some(10));

        cache.put(3, 30);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(10));
        assert_eq!(cache.get(&3), Some(30));
        assert_eq!(cache.stats().size, 2);
    }

    #[test]
    fn hit_ratio() {
        let cache: TtlCache<u32, u32> = TtlCache::new(10, Duration::from_secs(60));
        assert_eq!(cache.stats().hit_ratio, 0.0);

        cache.put(1, 1);
        cache.get(&1);
        cache.get(&1);
        cache.get(&2);

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 2);
        assert_eq!(stats.miss_count, 1);
        assert!((stats.hit_ratio - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn default_sizing() {
        let cache: TtlCache<u32, u32> = TtlCache::default();
        cache.put(1, 1);
        assert_eq!(cache.get(&1), Some(1));
    }
}
