//! Tunables for the RPC core. Defaults match production behaviour; the CLI
//! overrides them from flags and environment variables.

use crate::types::CacheTier;
use std::time::Duration;

/// Default public endpoint used when none is configured.
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Approximate slot cadence used for epoch ETA estimates.
pub const ASSUMED_SLOT_TIME_SECS: f64 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherConfig {
    /// Bound on a single endpoint attempt.
    pub request_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Hard cap on entries; reaching it triggers eviction before insert.
    pub max_entries: usize,
    /// How many soonest-to-expire entries one eviction pass removes.
    pub eviction_batch: usize,
    pub short_ttl: Duration,
    pub medium_ttl: Duration,
    pub long_ttl: Duration,
}

impl CacheConfig {
    pub fn ttl(&self, tier: CacheTier) -> Duration {
        match tier {
            CacheTier::Short => self.short_ttl,
            CacheTier::Medium => self.medium_ttl,
            CacheTier::Long => self.long_ttl,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            eviction_batch: 10,
            short_ttl: CacheTier::Short.default_ttl(),
            medium_ttl: CacheTier::Medium.default_ttl(),
            long_ttl: CacheTier::Long.default_ttl(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DedupConfig {
    /// Delay before the shared call starts, letting same-tick callers join.
    pub coalesce_delay: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            coalesce_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityConfig {
    /// Minimum age of the directory before a refresh hits the network again.
    pub refresh_interval: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Upper bound on `getBlock` requests in flight for one feed call.
    pub max_concurrent_blocks: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_concurrent_blocks: 8,
        }
    }
}

/// Everything the provider layer needs, bundled for one-shot construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientConfig {
    pub dispatcher: DispatcherConfig,
    pub cache: CacheConfig,
    pub dedup: DedupConfig,
    pub identity: IdentityConfig,
    pub feed: FeedConfig,
}
