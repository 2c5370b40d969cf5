//! Runtime cache configuration.
//!
//! Built from the `[cache]` and `[logging]` sections of the loaded settings.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_PLAYER_TTL_MINUTES: u64 = 5;
const DEFAULT_MAX_PLAYER_ENTRIES: usize = 1000;
const DEFAULT_REFRESH_INTERVAL_MINUTES: i64 = 15;
const DEFAULT_REBUILD_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Lifetime of an entity-cache entry, counted from insertion.
    pub player_ttl: Duration,
    /// LRU bound of the entity cache.
    pub max_player_entries: NonZeroUsize,
    /// Snapshot rebuild period; zero or negative disables the ticker.
    pub refresh_interval_minutes: i64,
    /// Players derived in parallel during one rebuild.
    pub rebuild_concurrency: NonZeroUsize,
    pub debug_cache: bool,
    pub debug_refresh: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            player_ttl: minutes(DEFAULT_PLAYER_TTL_MINUTES),
            max_player_entries: NonZeroUsize::new(DEFAULT_MAX_PLAYER_ENTRIES)
                .unwrap_or(NonZeroUsize::MIN),
            refresh_interval_minutes: DEFAULT_REFRESH_INTERVAL_MINUTES,
            rebuild_concurrency: NonZeroUsize::new(DEFAULT_REBUILD_CONCURRENCY)
                .unwrap_or(NonZeroUsize::MIN),
            debug_cache: false,
            debug_refresh: false,
        }
    }
}

impl From<&crate::config::Settings> for CacheConfig {
    fn from(settings: &crate::config::Settings) -> Self {
        Self {
            player_ttl: minutes(settings.cache.player_ttl_minutes.get()),
            max_player_entries: settings.cache.max_player_entries,
            refresh_interval_minutes: settings.cache.refresh_interval_minutes,
            rebuild_concurrency: settings.cache.rebuild_concurrency,
            debug_cache: settings.logging.debug_cache,
            debug_refresh: settings.logging.debug_refresh,
        }
    }
}

impl CacheConfig {
    /// Ticker period, or `None` when periodic refresh is disabled.
    pub fn refresh_period(&self) -> Option<Duration> {
        u64::try_from(self.refresh_interval_minutes)
            .ok()
            .filter(|value| *value > 0)
            .map(minutes)
    }
}

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.saturating_mul(60))
}
