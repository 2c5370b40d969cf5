//! Owner of both cache tiers and the only way callers reach the data source.

use std::ops::ControlFlow;
use std::sync::{Arc, RwLock, Weak};

use futures::{StreamExt, stream};
use metrics::{counter, gauge, histogram};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::application::derivation::derive_pathway;
use crate::application::source::{BeyonderSource, SourceError};
use crate::domain::{PathwayRecord, SnapshotRecord};
use crate::util::lock::{rw_read, rw_write};

use super::config::CacheConfig;
use super::entity::EntityCache;
use super::scheduler::RefreshScheduler;
use super::snapshot::SnapshotCache;

const SOURCE: &str = "cache::coordinator";

pub(crate) const METRIC_REBUILD_FAILED: &str = "reporter_snapshot_rebuild_failed_total";
pub(crate) const METRIC_REBUILD_MS: &str = "reporter_snapshot_rebuild_ms";
pub(crate) const METRIC_SNAPSHOT_BEYONDERS: &str = "reporter_snapshot_beyonders";

/// Point-in-time occupancy of both tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub player_entries: usize,
    pub everyone_entries: usize,
    pub snapshot_cached: bool,
    pub refresh_interval_minutes: i64,
    pub scheduler_running: bool,
}

/// Cheaply cloneable handle; every clone drives the same caches.
#[derive(Clone)]
pub struct CacheCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    source: Arc<dyn BeyonderSource>,
    entities: EntityCache,
    snapshot: SnapshotCache,
    scheduler: RefreshScheduler,
    config: RwLock<CacheConfig>,
}

impl CacheCoordinator {
    /// Build the caches, dispatch the first snapshot rebuild and start the
    /// periodic ticker. Must be called from within a tokio runtime.
    pub fn new(source: Arc<dyn BeyonderSource>, config: CacheConfig) -> Self {
        let coordinator = Self::idle(source, config);
        Inner::spawn_rebuild(&coordinator.inner, "startup");
        coordinator.start_scheduler(&config);
        coordinator
    }

    /// Build a single snapshot with no startup dispatch and no ticker.
    pub async fn snapshot_once(
        source: Arc<dyn BeyonderSource>,
        config: CacheConfig,
    ) -> Result<Arc<SnapshotRecord>, SourceError> {
        Self::idle(source, config).get_snapshot().await
    }

    fn idle(source: Arc<dyn BeyonderSource>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                entities: EntityCache::new(config.player_ttl, config.max_player_entries),
                snapshot: SnapshotCache::new(),
                scheduler: RefreshScheduler::new(),
                config: RwLock::new(config),
            }),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.inner.config()
    }

    /// Cached record for `name`, deriving and storing it on a miss.
    ///
    /// Source failures are returned and leave the cache untouched.
    pub async fn get_entity(&self, name: &str) -> Result<PathwayRecord, SourceError> {
        let debug_cache = self.inner.config().debug_cache;

        if let Some(record) = self.inner.entities.get(name) {
            if debug_cache {
                info!(target = "reporter::cache", player = name, "entity cache hit");
            }
            return Ok(record);
        }
        if debug_cache {
            info!(target = "reporter::cache", player = name, "entity cache miss");
        }

        let record = derive_pathway(name, self.inner.source.as_ref()).await?;
        self.inner.entities.put(name, record.clone());
        Ok(record)
    }

    /// Cached snapshot, or a fresh one built inline when the slot is empty.
    pub async fn get_snapshot(&self) -> Result<Arc<SnapshotRecord>, SourceError> {
        let debug_cache = self.inner.config().debug_cache;

        if let Some(snapshot) = self.inner.snapshot.read() {
            if debug_cache {
                info!(target = "reporter::cache", "snapshot cache hit");
            }
            return Ok(snapshot);
        }
        if debug_cache {
            info!(
                target = "reporter::cache",
                "snapshot cache miss, rebuilding inline"
            );
        }

        let snapshot = self.inner.rebuild().await?;
        Ok(self.inner.snapshot.replace(snapshot))
    }

    pub fn invalidate_entity(&self, name: &str) {
        self.inner.entities.invalidate(name);
        if self.inner.config().debug_cache {
            info!(target = "reporter::cache", player = name, "entity cache invalidated");
        }
    }

    /// Empty both tiers. Does not schedule a rebuild.
    pub fn invalidate_all(&self) {
        self.inner.entities.invalidate_all();
        self.inner.snapshot.clear();
        if self.inner.config().debug_cache {
            info!(target = "reporter::cache", "all caches invalidated");
        }
    }

    /// Dispatch a background snapshot rebuild and return immediately.
    ///
    /// Triggers are not coalesced; overlapping rebuilds each swap in their
    /// result and the last one wins. The handle may be ignored.
    pub fn refresh(&self) -> JoinHandle<()> {
        Inner::spawn_rebuild(&self.inner, "refresh")
    }

    /// Apply a freshly loaded configuration, then invalidate and refresh.
    ///
    /// TTL and capacity are fixed for the lifetime of the entity cache and
    /// only change after a restart.
    pub fn reload(&self, next: CacheConfig) -> JoinHandle<()> {
        let previous = self.inner.config();

        if next.player_ttl != previous.player_ttl
            || next.max_player_entries != previous.max_player_entries
        {
            warn!(
                target = "reporter::cache",
                current_ttl_secs = previous.player_ttl.as_secs(),
                requested_ttl_secs = next.player_ttl.as_secs(),
                current_max_entries = previous.max_player_entries.get(),
                requested_max_entries = next.max_player_entries.get(),
                "entity cache TTL and capacity changes take effect after a restart"
            );
        }

        let applied = CacheConfig {
            player_ttl: previous.player_ttl,
            max_player_entries: previous.max_player_entries,
            ..next
        };
        *rw_write(&self.inner.config, SOURCE, "reload") = applied;

        if applied.refresh_interval_minutes != previous.refresh_interval_minutes {
            self.inner.scheduler.stop();
            self.start_scheduler(&applied);
        }

        self.invalidate_all();
        Inner::spawn_rebuild(&self.inner, "reload")
    }

    pub fn stats(&self) -> CacheStats {
        let snapshot = self.inner.snapshot.read();
        CacheStats {
            player_entries: self.inner.entities.estimated_size(),
            everyone_entries: snapshot.as_ref().map_or(0, |snapshot| snapshot.amount()),
            snapshot_cached: snapshot.is_some(),
            refresh_interval_minutes: self.inner.config().refresh_interval_minutes,
            scheduler_running: self.inner.scheduler.is_running(),
        }
    }

    /// Stop the ticker and empty both tiers. Rebuilds already running finish
    /// on their own.
    pub fn shutdown(&self) {
        if self.inner.scheduler.stop() {
            info!(target = "reporter::cache", "snapshot refresh scheduler stopped");
        }
        self.inner.entities.invalidate_all();
        self.inner.snapshot.clear();
    }

    fn start_scheduler(&self, config: &CacheConfig) {
        let Some(period) = config.refresh_period() else {
            info!(
                target = "reporter::cache",
                "automatic snapshot refresh is disabled"
            );
            return;
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner
            .scheduler
            .start(period, move || match weak.upgrade() {
                Some(inner) => {
                    Inner::spawn_rebuild(&inner, "scheduler");
                    ControlFlow::Continue(())
                }
                None => ControlFlow::Break(()),
            });

        info!(
            target = "reporter::cache",
            interval_minutes = config.refresh_interval_minutes,
            "snapshot refresh scheduler started"
        );
    }
}

impl Inner {
    fn config(&self) -> CacheConfig {
        *rw_read(&self.config, SOURCE, "config")
    }

    fn spawn_rebuild(inner: &Arc<Inner>, trigger: &'static str) -> JoinHandle<()> {
        let inner = Arc::clone(inner);
        tokio::spawn(async move { inner.rebuild_and_swap(trigger).await })
    }

    async fn rebuild_and_swap(&self, trigger: &'static str) {
        if self.config().debug_refresh {
            info!(target = "reporter::refresh", trigger, "snapshot refresh started");
        }

        match self.rebuild().await {
            Ok(snapshot) => {
                let snapshot = self.snapshot.replace(snapshot);
                if self.config().debug_refresh {
                    info!(
                        target = "reporter::refresh",
                        trigger,
                        beyonders = snapshot.amount(),
                        "snapshot refresh finished"
                    );
                }
            }
            Err(err) => {
                counter!(METRIC_REBUILD_FAILED).increment(1);
                error!(
                    target = "reporter::refresh",
                    trigger,
                    error = %err,
                    "snapshot refresh failed; keeping previous snapshot"
                );
            }
        }
    }

    /// Derive every tracked player the source knows about.
    ///
    /// Results keep the listing order. Players are written into the entity
    /// cache as they are visited, before the caller swaps the snapshot in.
    async fn rebuild(&self) -> Result<SnapshotRecord, SourceError> {
        let started_at = Instant::now();
        let concurrency = self.config().rebuild_concurrency.get();

        let names = self.source.list_known_identifiers().await?;
        let visited: Vec<Option<PathwayRecord>> = stream::iter(
            names
                .into_iter()
                .filter(|name| !name.trim().is_empty()),
        )
        .map(|name| self.visit(name))
        .buffered(concurrency)
        .collect()
        .await;

        let snapshot = SnapshotRecord::new(visited.into_iter().flatten().collect());

        histogram!(METRIC_REBUILD_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        gauge!(METRIC_SNAPSHOT_BEYONDERS).set(snapshot.amount() as f64);
        Ok(snapshot)
    }

    async fn visit(&self, name: String) -> Option<PathwayRecord> {
        let outcome = match self.source.is_tracked(&name).await {
            Ok(false) => return None,
            Ok(true) => derive_pathway(&name, self.source.as_ref()).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(record) if record.is_beyonder() => {
                self.entities.put(&name, record.clone());
                Some(record)
            }
            Ok(_) => None,
            Err(err) => {
                warn!(
                    target = "reporter::refresh",
                    player = %name,
                    error = %err,
                    "skipping player after source error"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::time::Duration;

    use super::*;
    use crate::domain::pathway::PathwayDetail;
    use crate::infra::source::{BeyonderFixture, InMemorySource};

    fn detail(lowest: i32, acting: f64, needed: f64) -> PathwayDetail {
        PathwayDetail {
            lowest_sequence_level: lowest,
            acting,
            needed_acting: needed,
        }
    }

    fn config() -> CacheConfig {
        CacheConfig {
            refresh_interval_minutes: 0,
            ..CacheConfig::default()
        }
    }

    fn seeded() -> Arc<InMemorySource> {
        let source = Arc::new(InMemorySource::new());
        source.insert(
            "Klein",
            BeyonderFixture::tracked().pathway("Seer", 9, detail(9, 5.0, 10.0)),
        );
        source.insert(
            "Audrey",
            BeyonderFixture::tracked().pathway("Spectator", 8, detail(8, 0.0, 0.0)),
        );
        source.insert("Steve", BeyonderFixture::untracked());
        source
    }

    async fn yield_many() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    async fn settled(coordinator: &CacheCoordinator) {
        // Wait for the startup rebuild so tests start from a known state.
        for _ in 0..100 {
            if coordinator.stats().snapshot_cached {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn entity_lookup_is_cached() {
        let source = seeded();
        let coordinator = CacheCoordinator::new(source.clone(), config());
        settled(&coordinator).await;
        coordinator.invalidate_all();
        let before = source.calls().is_tracked;

        let first = coordinator.get_entity("Klein").await.expect("first");
        assert_eq!(first, PathwayRecord::tracked("Klein", "Seer", "9", "0.5"));
        assert_eq!(source.calls().is_tracked, before + 1);

        let second = coordinator.get_entity("Klein").await.expect("second");
        assert_eq!(second, first);
        assert_eq!(source.calls().is_tracked, before + 1);
    }

    #[tokio::test]
    async fn unknown_player_is_not_tracked() {
        let coordinator = CacheCoordinator::new(seeded(), config());
        let record = coordinator.get_entity("Nobody").await.expect("lookup");
        assert_eq!(record, PathwayRecord::not_tracked("Nobody"));
    }

    #[tokio::test]
    async fn source_failure_is_returned_and_not_cached() {
        let source = seeded();
        let coordinator = CacheCoordinator::new(source.clone(), config());
        settled(&coordinator).await;
        coordinator.invalidate_all();
        source.fail_player("Klein");

        assert!(coordinator.get_entity("Klein").await.is_err());
        assert_eq!(coordinator.stats().player_entries, 0);

        source.recover_player("Klein");
        let record = coordinator.get_entity("Klein").await.expect("recovered");
        assert!(record.is_beyonder());
    }

    #[tokio::test]
    async fn snapshot_contains_only_tracked_players() {
        let coordinator = CacheCoordinator::new(seeded(), config());
        let snapshot = coordinator.get_snapshot().await.expect("snapshot");

        assert_eq!(snapshot.amount(), 2);
        assert_eq!(snapshot.amount(), snapshot.beyonders().len());
        let names: Vec<&str> = snapshot.beyonders().iter().map(|r| r.player()).collect();
        assert_eq!(names, vec!["Klein", "Audrey"]);
        assert_eq!(snapshot.beyonders()[1].acting(), Some("0"));
    }

    #[tokio::test]
    async fn empty_population_gives_empty_snapshot() {
        let coordinator = CacheCoordinator::new(Arc::new(InMemorySource::new()), config());
        let snapshot = coordinator.get_snapshot().await.expect("snapshot");
        assert_eq!(snapshot.amount(), 0);
        assert!(snapshot.beyonders().is_empty());
    }

    #[tokio::test]
    async fn invalidate_all_forces_inline_rebuild_with_fresh_data() {
        let source = seeded();
        let coordinator = CacheCoordinator::new(source.clone(), config());
        settled(&coordinator).await;
        assert_eq!(coordinator.get_snapshot().await.expect("warm").amount(), 2);

        source.insert(
            "Leonard",
            BeyonderFixture::tracked().pathway("Sleepless", 7, detail(7, 1.0, 4.0)),
        );
        coordinator.invalidate_all();
        let stats = coordinator.stats();
        assert!(!stats.snapshot_cached);
        assert_eq!(stats.player_entries, 0);

        let before = source.calls().list_known_identifiers;
        let snapshot = coordinator.get_snapshot().await.expect("rebuilt");
        assert_eq!(source.calls().list_known_identifiers, before + 1);
        assert_eq!(snapshot.amount(), 3);
    }

    #[tokio::test]
    async fn rebuild_warms_entity_cache() {
        let source = seeded();
        let coordinator = CacheCoordinator::new(source.clone(), config());
        coordinator.refresh().await.expect("refresh task");

        assert_eq!(coordinator.stats().player_entries, 2);
        let before = source.calls();
        coordinator.get_entity("Audrey").await.expect("cached");
        assert_eq!(source.calls(), before);
    }

    #[tokio::test]
    async fn failing_player_is_skipped_during_rebuild() {
        let source = seeded();
        source.fail_player("Audrey");
        let coordinator = CacheCoordinator::new(source.clone(), config());

        let snapshot = coordinator.get_snapshot().await.expect("snapshot");
        assert_eq!(snapshot.amount(), 1);
        assert_eq!(snapshot.beyonders()[0].player(), "Klein");
    }

    #[tokio::test]
    async fn listing_failure_keeps_previous_snapshot() {
        let source = seeded();
        let coordinator = CacheCoordinator::new(source.clone(), config());
        let warm = coordinator.get_snapshot().await.expect("snapshot");

        source.fail_listing(true);
        coordinator.refresh().await.expect("refresh task");
        let kept = coordinator.get_snapshot().await.expect("still cached");
        assert!(Arc::ptr_eq(&warm, &kept));

        coordinator.invalidate_all();
        assert!(coordinator.get_snapshot().await.is_err());
    }

    #[tokio::test]
    async fn concurrent_refreshes_leave_a_valid_snapshot() {
        let source = Arc::new(seeded_with_latency());
        let coordinator = CacheCoordinator::new(source.clone(), config());

        let handles: Vec<_> = (0..8).map(|_| coordinator.refresh()).collect();
        for handle in handles {
            handle.await.expect("refresh task");
        }

        let snapshot = coordinator.get_snapshot().await.expect("snapshot");
        assert_eq!(snapshot.amount(), snapshot.beyonders().len());
        assert_eq!(snapshot.amount(), 2);
    }

    fn seeded_with_latency() -> InMemorySource {
        let source = InMemorySource::new().with_latency(Duration::from_millis(1));
        source.insert(
            "Klein",
            BeyonderFixture::tracked().pathway("Seer", 9, detail(9, 5.0, 10.0)),
        );
        source.insert(
            "Audrey",
            BeyonderFixture::tracked().pathway("Spectator", 8, detail(8, 0.0, 0.0)),
        );
        source
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_keeps_serving_previous_snapshot_until_swap() {
        let coordinator = CacheCoordinator::idle(Arc::new(seeded_with_latency()), config());
        let warm = coordinator.get_snapshot().await.expect("snapshot");

        let handle = coordinator.refresh();
        yield_many().await;
        assert!(!handle.is_finished());
        let during = coordinator.get_snapshot().await.expect("still cached");
        assert!(Arc::ptr_eq(&warm, &during));

        handle.await.expect("refresh task");
        let swapped = coordinator.get_snapshot().await.expect("swapped");
        assert!(!Arc::ptr_eq(&warm, &swapped));
        assert_eq!(swapped.amount(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rebuild_dispatched_before_shutdown_still_lands() {
        let coordinator = CacheCoordinator::idle(Arc::new(seeded_with_latency()), config());
        coordinator.get_snapshot().await.expect("snapshot");

        let handle = coordinator.refresh();
        yield_many().await;
        coordinator.shutdown();
        assert!(!coordinator.stats().snapshot_cached);

        handle.await.expect("refresh task");
        let stats = coordinator.stats();
        assert!(stats.snapshot_cached);
        assert_eq!(stats.everyone_entries, 2);
        assert!(!stats.scheduler_running);
    }

    #[tokio::test]
    async fn snapshot_once_rebuilds_exactly_once() {
        let source = seeded();
        let snapshot = CacheCoordinator::snapshot_once(source.clone(), config())
            .await
            .expect("snapshot");

        assert_eq!(snapshot.amount(), 2);
        yield_many().await;
        assert_eq!(source.calls().list_known_identifiers, 1);
    }

    #[tokio::test]
    async fn blank_identifiers_are_skipped() {
        let source = seeded();
        source.add_identifier("  ");
        let coordinator = CacheCoordinator::new(source, config());

        let snapshot = coordinator.get_snapshot().await.expect("snapshot");
        assert_eq!(snapshot.amount(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduler_rebuilds_after_each_interval() {
        let source = seeded();
        let coordinator = CacheCoordinator::new(
            source.clone(),
            CacheConfig {
                refresh_interval_minutes: 1,
                ..CacheConfig::default()
            },
        );
        coordinator.get_snapshot().await.expect("snapshot");
        assert!(coordinator.stats().scheduler_running);
        yield_many().await;
        let before = source.calls().list_known_identifiers;

        tokio::time::advance(Duration::from_secs(60)).await;
        yield_many().await;
        assert!(source.calls().list_known_identifiers > before);
    }

    #[tokio::test]
    async fn disabled_interval_means_no_scheduler() {
        let coordinator = CacheCoordinator::new(seeded(), config());
        assert!(!coordinator.stats().scheduler_running);
        assert_eq!(coordinator.stats().refresh_interval_minutes, 0);
    }

    #[tokio::test]
    async fn reload_applies_interval_and_debug_flags() {
        let coordinator = CacheCoordinator::new(seeded(), config());

        let next = CacheConfig {
            refresh_interval_minutes: 30,
            player_ttl: Duration::from_secs(1),
            max_player_entries: NonZeroUsize::MIN,
            debug_cache: true,
            ..config()
        };
        coordinator.reload(next).await.expect("reload refresh");

        let applied = coordinator.config();
        assert!(applied.debug_cache);
        assert_eq!(applied.refresh_interval_minutes, 30);
        assert_eq!(applied.player_ttl, CacheConfig::default().player_ttl);
        assert_eq!(applied.max_player_entries.get(), 1000);

        let stats = coordinator.stats();
        assert!(stats.scheduler_running);
        assert!(stats.snapshot_cached);
        assert_eq!(stats.everyone_entries, 2);
    }

    #[tokio::test]
    async fn shutdown_stops_scheduler_and_clears() {
        let coordinator = CacheCoordinator::new(
            seeded(),
            CacheConfig {
                refresh_interval_minutes: 5,
                ..CacheConfig::default()
            },
        );
        coordinator.get_snapshot().await.expect("snapshot");
        coordinator.get_entity("Steve").await.expect("entity");

        coordinator.shutdown();
        coordinator.shutdown();

        let stats = coordinator.stats();
        assert!(!stats.scheduler_running);
        assert!(!stats.snapshot_cached);
        assert_eq!(stats.player_entries, 0);
    }

    #[tokio::test]
    async fn stats_report_snapshot_size() {
        let coordinator = CacheCoordinator::new(seeded(), config());
        coordinator.get_snapshot().await.expect("snapshot");
        coordinator.get_entity("Steve").await.expect("entity");

        let stats = coordinator.stats();
        assert_eq!(stats.everyone_entries, 2);
        assert!(stats.snapshot_cached);
        assert!(stats.player_entries >= 1);
    }
}
