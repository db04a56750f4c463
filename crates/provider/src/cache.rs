//! Tiered-expiry response cache with a hard size cap.
//!
//! No background sweeper: expired entries are dropped when read, and a full
//! cache evicts its soonest-to-expire entries before accepting a new one.

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::time::Instant;
use vantage_core::config::CacheConfig;
use vantage_core::CacheTier;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Key/value store with per-entry expiry.
///
/// Generic over the stored value so the dispatcher can hold raw JSON while
/// aggregators hold their own derived views.
pub struct ResponseCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    config: CacheConfig,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::with_capacity(config.max_entries)),
            config,
        }
    }

    /// Returns the live value for `key`. An expired entry is removed and
    /// reported as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some(entry) if Instant::now() <= entry.expires_at => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
            tracing::trace!(key, "cache entry expired");
        }
        None
    }

    /// Stores `value` under `key` with the TTL of `tier`, replacing any
    /// previous entry wholesale.
    pub fn set(&self, key: impl Into<String>, value: V, tier: CacheTier) {
        let key = key.into();
        let expires_at = Instant::now() + self.config.ttl(tier);
        let mut entries = self.entries.lock();

        if entries.len() >= self.config.max_entries {
            let batch = self.config.eviction_batch.max(1);
            let mut by_expiry: Vec<(Instant, String)> = entries
                .iter()
                .map(|(k, e)| (e.expires_at, k.clone()))
                .collect();
            by_expiry.sort_unstable();
            for (_, victim) in by_expiry.into_iter().take(batch) {
                entries.remove(&victim);
            }
            tracing::debug!(evicted = batch, remaining = entries.len(), "cache full, evicted");
        }

        entries.insert(key, CacheEntry { value, expires_at });
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Entry count, including entries that expired but were not read yet.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn short_tier_boundary() {
        let cache = ResponseCache::default();
        cache.set("x", 1, CacheTier::Short);

        tokio::time::advance(Duration::from_millis(2_999)).await;
        assert_eq!(cache.get("x"), Some(1));

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(cache.get("x"), None);
        assert!(cache.is_empty(), "expired entry must be removed on read");
    }

    #[tokio::test(start_paused = true)]
    async fn each_tier_expires_on_its_own_clock() {
        let cache = ResponseCache::default();
        cache.set("s", "short", CacheTier::Short);
        cache.set("m", "medium", CacheTier::Medium);
        cache.set("l", "long", CacheTier::Long);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(cache.get("s"), None);
        assert_eq!(cache.get("m"), Some("medium"));

        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(cache.get("m"), None);
        assert_eq!(cache.get("l"), Some("long"));

        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(cache.get("l"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn overwrite_replaces_value_and_expiry() {
        let cache = ResponseCache::default();
        cache.set("k", 1, CacheTier::Short);
        tokio::time::advance(Duration::from_secs(2)).await;
        cache.set("k", 2, CacheTier::Short);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_keeps_latest_expiries() {
        let cache = ResponseCache::default();
        for i in 0..120 {
            cache.set(format!("k{i}"), i, CacheTier::Medium);
            assert!(cache.len() <= 50, "cap exceeded after {i} inserts");
            tokio::time::advance(Duration::from_millis(1)).await;
        }

        // The newest insert always survives, the oldest never does.
        assert_eq!(cache.get("k119"), Some(119));
        assert_eq!(cache.get("k0"), None);

        let live: Vec<i32> = (0..120).filter(|i| cache.get(&format!("k{i}")).is_some()).collect();
        let min_live = *live.iter().min().unwrap();
        assert!(
            live.iter().copied().eq(min_live..120),
            "retained set must be a suffix of insertion order: {live:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_prefers_soonest_expiry_over_insertion_order() {
        let cache = ResponseCache::default();
        // One long-lived entry inserted first, then short-lived filler.
        cache.set("anchor", -1, CacheTier::Long);
        for i in 0..49 {
            cache.set(format!("short{i}"), i, CacheTier::Short);
        }
        assert_eq!(cache.len(), 50);

        cache.set("trigger", 99, CacheTier::Short);
        assert_eq!(cache.len(), 41);
        assert_eq!(cache.get("anchor"), Some(-1));
        assert_eq!(cache.get("trigger"), Some(99));
    }

    #[test]
    fn clear_empties_everything() {
        let cache = ResponseCache::default();
        cache.set("a", 1, CacheTier::Long);
        cache.set("b", 2, CacheTier::Long);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }
}
