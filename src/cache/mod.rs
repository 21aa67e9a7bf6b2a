//! Caching for loaded templates and rendered output.
//!
//! Two layers are provided:
//!
//! - [`LruCache`] - a fixed-capacity, recency-ordered cache with hit/miss
//!   counters. Inserting a new key at capacity evicts the single
//!   least-recently-used entry.
//! - [`MultiLevelCache`] - composes two independently-sized [`LruCache`]
//!   instances (resolved template paths, rendered strings) behind one enable
//!   flag. When disabled the underlying caches are bypassed entirely, so
//!   counters are never polluted by the non-cached code path.
//!
//! Cache keys are produced by [`CacheKeyBuilder`] in [`key`]: a deterministic
//! string built from template identity, version, and a fingerprint of the
//! validated parameters.
//!
//! Nothing here persists across process restarts, and no internal locking is
//! provided - callers sharing an instance across threads must serialize
//! access externally (lookups update recency order, so `get` is a mutation
//! too).

pub mod key;

pub use key::CacheKeyBuilder;

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use crate::core::{PromptError, Result};

/// Point-in-time statistics for one [`LruCache`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of entries currently held
    pub size: usize,
    /// Maximum number of entries
    pub capacity: usize,
    /// Lookups that found an entry
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// hits / (hits + misses), 0.0 when no lookups have occurred
    pub hit_rate: f64,
}

/// Fixed-capacity cache that evicts the least-recently-used entry on
/// overflow.
///
/// Recency is updated by both `get` and `put`: the entry least recently
/// touched by either is the one evicted. Hit/miss counters accumulate until
/// [`clear`](LruCache::clear).
///
/// Promotion is a linear scan of the recency deque; capacities in this
/// crate are small (tens to hundreds of entries).
#[derive(Debug)]
pub struct LruCache<V> {
    capacity: usize,
    entries: HashMap<String, V>,
    // Front is least recently used, back is most recently used.
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

impl<V> LruCache<V> {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// Fails with [`PromptError::Cache`] when `capacity` is zero - a cache
    /// that can hold nothing would turn every `put` into an immediate
    /// eviction of itself.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PromptError::cache("cache capacity must be non-zero"));
        }
        Ok(Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        })
    }

    /// Look up `key`, promoting it to most-recently-used on a hit.
    ///
    /// Records a hit or a miss on every call.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        if self.entries.contains_key(key) {
            self.hits += 1;
            self.promote(key);
            self.entries.get(key)
        } else {
            self.misses += 1;
            None
        }
    }

    /// Insert or overwrite `key`.
    ///
    /// Overwriting an existing key updates the value in place and promotes
    /// it. Inserting a new key at capacity first evicts the
    /// least-recently-used entry.
    pub fn put(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        if self.entries.contains_key(&key) {
            self.promote(&key);
        } else {
            if self.entries.len() >= self.capacity {
                if let Some(lru) = self.order.pop_front() {
                    tracing::debug!("Cache at capacity, evicting least recently used entry: {lru}");
                    self.entries.remove(&lru);
                }
            }
            self.order.push_back(key.clone());
        }
        self.entries.insert(key, value);
    }

    /// Remove `key` if present. Returns whether anything was removed.
    pub fn remove(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    /// Drop every entry and reset the hit/miss counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` is present, without touching recency or counters.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Current statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        let total = self.hits + self.misses;
        let hit_rate = if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        };
        CacheStats {
            size: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits,
            misses: self.misses,
            hit_rate,
        }
    }

    /// Move `key` to the most-recently-used position.
    fn promote(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.to_string());
    }
}

/// Combined statistics for a [`MultiLevelCache`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiLevelStats {
    /// Whether the cache is enabled
    pub enabled: bool,
    /// Statistics for the template tier
    pub template_cache: CacheStats,
    /// Statistics for the rendered-output tier
    pub render_cache: CacheStats,
}

/// Two-tier cache: resolved template paths and fully rendered strings.
///
/// The template tier memoizes template-path resolution (which file a
/// template type + version pair maps to); the render tier holds finished
/// render output keyed by identity, version, and parameter fingerprint.
///
/// When disabled, every `get` returns `None` unconditionally and every `put`
/// is a no-op. The underlying caches are not consulted at all, so their
/// counters stay at zero no matter what the caller does.
#[derive(Debug)]
pub struct MultiLevelCache {
    enabled: bool,
    template_cache: LruCache<String>,
    render_cache: LruCache<String>,
}

impl MultiLevelCache {
    /// Create a multi-level cache with independent tier capacities.
    pub fn new(template_cache_size: usize, render_cache_size: usize, enabled: bool) -> Result<Self> {
        Ok(Self {
            enabled,
            template_cache: LruCache::new(template_cache_size)?,
            render_cache: LruCache::new(render_cache_size)?,
        })
    }

    /// Whether the cache is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Get a resolved template path from the template tier.
    pub fn get_template(&mut self, key: &str) -> Option<&String> {
        if !self.enabled {
            return None;
        }
        self.template_cache.get(key)
    }

    /// Store a resolved template path in the template tier.
    pub fn put_template(&mut self, key: impl Into<String>, path: String) {
        if self.enabled {
            self.template_cache.put(key, path);
        }
    }

    /// Get a rendered string from the render tier.
    pub fn get_render(&mut self, key: &str) -> Option<&String> {
        if !self.enabled {
            return None;
        }
        self.render_cache.get(key)
    }

    /// Store a rendered string in the render tier.
    pub fn put_render(&mut self, key: impl Into<String>, rendered: String) {
        if self.enabled {
            self.render_cache.put(key, rendered);
        }
    }

    /// Clear both tiers together, counters included.
    pub fn clear(&mut self) {
        self.template_cache.clear();
        self.render_cache.clear();
    }

    /// Statistics for both tiers plus the enabled flag.
    pub fn stats(&self) -> MultiLevelStats {
        MultiLevelStats {
            enabled: self.enabled,
            template_cache: self.template_cache.stats(),
            render_cache: self.render_cache.stats(),
        }
    }
}
