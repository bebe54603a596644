//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

// Default values for cache configuration
const DEFAULT_ENTRY_TTL_SECS: u64 = 300;
const DEFAULT_ENTRY_LIMIT: usize = 1024;
const DEFAULT_OP_TIMEOUT_MS: u64 = 250;

/// Cache tuning knobs, deserialized from the `[cache]` settings section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the cache-aside layer. Disabled, every read goes to the store.
    pub enabled: bool,
    /// Absolute lifetime of an entry from the moment it is written.
    pub entry_ttl_secs: u64,
    /// Maximum cached entries before LRU eviction.
    pub entry_limit: usize,
    /// Deadline for any single cache operation issued by the coordinator.
    pub op_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entry_ttl_secs: DEFAULT_ENTRY_TTL_SECS,
            entry_limit: DEFAULT_ENTRY_LIMIT,
            op_timeout_ms: DEFAULT_OP_TIMEOUT_MS,
        }
    }
}

impl CacheConfig {
    pub fn entry_ttl(&self) -> Duration {
        Duration::from_secs(self.entry_ttl_secs)
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    pub fn entry_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.entry_limit)
            .unwrap_or_else(|| NonZeroUsize::new(DEFAULT_ENTRY_LIMIT).expect("non-zero default"))
    }
}
