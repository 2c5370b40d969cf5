//! Two-tier cache in front of the beyonder data source.
//!
//! - **Entity cache**: per-player `PathwayRecord`s, LRU bounded with a TTL
//!   counted from insertion.
//! - **Snapshot cache**: one `SnapshotRecord` for the whole tracked
//!   population, rebuilt in the background and swapped in whole.
//!
//! Both are owned by [`CacheCoordinator`], which also runs the periodic
//! refresh ticker.
//!
//! ```toml
//! [cache]
//! player_ttl = 5
//! max_player_entries = 1000
//! refresh_interval = 15
//! rebuild_concurrency = 4
//! ```

mod config;
mod coordinator;
mod entity;
mod scheduler;
mod snapshot;

pub use config::CacheConfig;
pub use coordinator::{CacheCoordinator, CacheStats};
pub use entity::EntityCache;
pub use scheduler::RefreshScheduler;
pub use snapshot::SnapshotCache;

pub(crate) mod metric_names {
    pub(crate) use super::coordinator::{
        METRIC_REBUILD_FAILED, METRIC_REBUILD_MS, METRIC_SNAPSHOT_BEYONDERS,
    };
    pub(crate) use super::entity::{METRIC_ENTITY_EVICT, METRIC_ENTITY_HIT, METRIC_ENTITY_MISS};
}
