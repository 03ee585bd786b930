//! Bounded in-memory cache with TTL and LRU eviction.
//!
//! Building block for the higher-level caches in this crate. Every entry
//! carries an absolute expiry; reads of expired entries behave as misses
//! and drop the entry, live reads promote the entry to most-recently-used.
//! Inserting at capacity evicts exactly the least-recently-used entry.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Cached value with its absolute expiry
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Bounded TTL cache with LRU eviction
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    /// Keys in recency order, least-recently-used first
    order: Vec<K>,
    max_size: usize,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// Create a cache holding at most `max_size` entries for `ttl` each.
    ///
    /// Panics if `max_size` is zero or `ttl` is not positive; both are
    /// programmer contract violations, not runtime conditions.
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        assert!(max_size > 0, "cache size must be positive");
        assert!(!ttl.is_zero(), "cache TTL must be positive");
        Self {
            entries: HashMap::with_capacity(max_size),
            order: Vec::with_capacity(max_size),
            max_size,
            ttl,
        }
    }

    /// Look up a key; a live hit is promoted to most-recently-used, an
    /// expired hit is removed and reported as a miss.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let (expired, value) = match self.entries.get(key) {
            Some(entry) => (entry.is_expired(), entry.value.clone()),
            None => return None,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.promote(key);
        Some(value)
    }

    /// Insert a value as most-recently-used, evicting the single
    /// least-recently-used entry if the cache is at capacity.
    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.contains_key(&key) {
            self.promote(&key);
        } else {
            if self.entries.len() >= self.max_size {
                if let Some(lru) = self.order.first().cloned() {
                    self.remove(&lru);
                }
            }
            self.order.push(key.clone());
        }
        self.entries.insert(key, CacheEntry::new(value, self.ttl));
    }

    /// Check for a live entry without touching recency order
    pub fn contains(&self, key: &K) -> bool {
        self.entries.get(key).is_some_and(|entry| !entry.is_expired())
    }

    /// Remove an entry, returning its value (even if already expired)
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(entry.value)
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Sweep out all expired entries, returning how many were removed
    pub fn prune(&mut self) -> usize {
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    /// Keys in recency order, least-recently-used first
    pub fn keys(&self) -> Vec<K> {
        self.order.clone()
    }

    /// Number of stored entries; may include expired entries that have
    /// not been pruned or read yet
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn promote(&mut self, key: &K) {
        self.order.retain(|k| k != key);
        self.order.push(key.clone());
    }
}
