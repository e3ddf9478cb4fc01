//! Engine configuration surface.
//!
//! Loading from files or environment variables is the embedder's concern;
//! the engine only requires that the struct deserializes and has sane
//! defaults.

use serde::Deserialize;
use std::time::Duration;

/// Seconds before a built corpus is considered stale.
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Default cap on rebuilds running at the same time across libraries.
pub const DEFAULT_MAX_CONCURRENT_REBUILDS: usize = 4;

/// Tunables for the cache and freshness controller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Time-to-live of a corpus generation, in seconds. Once
    /// `now - fetched_at` exceeds this, the corpus reports `Stale` and the
    /// next query triggers a background rebuild.
    pub ttl_secs: u64,

    /// Upper bound on concurrently running rebuilds across all libraries.
    /// Values below 1 are treated as 1.
    pub max_concurrent_rebuilds: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
            max_concurrent_rebuilds: DEFAULT_MAX_CONCURRENT_REBUILDS,
        }
    }
}

impl EngineConfig {
    /// The configured time-to-live as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}
