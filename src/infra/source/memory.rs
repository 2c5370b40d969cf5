//! Programmable in-memory source used by tests and the offline commands.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::application::source::{BeyonderSource, SourceError};
use crate::domain::pathway::{PathwayDetail, ProgressionMap};
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "infra::source::memory";

/// Data for one player held by [`InMemorySource`].
#[derive(Debug, Clone, Default)]
pub struct BeyonderFixture {
    tracked: bool,
    pathways: ProgressionMap,
    details: HashMap<String, PathwayDetail>,
}

impl BeyonderFixture {
    pub fn untracked() -> Self {
        Self::default()
    }

    pub fn tracked() -> Self {
        Self {
            tracked: true,
            ..Self::default()
        }
    }

    pub fn pathway(mut self, name: &str, sequence: i32, detail: PathwayDetail) -> Self {
        self.pathways.insert(name.to_string(), sequence);
        self.details.insert(name.to_string(), detail);
        self
    }

    /// Lists a pathway in the progression map without any detail record.
    pub fn pathway_without_detail(mut self, name: &str, sequence: i32) -> Self {
        self.pathways.insert(name.to_string(), sequence);
        self
    }
}

/// Totals of trait calls served so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub is_tracked: usize,
    pub progression_map: usize,
    pub pathway_detail: usize,
    pub list_known_identifiers: usize,
}

#[derive(Default)]
struct State {
    players: IndexMap<String, BeyonderFixture>,
    extra_identifiers: Vec<String>,
    failing: HashSet<String>,
    fail_listing: bool,
}

#[derive(Default)]
struct Counters {
    is_tracked: AtomicUsize,
    progression_map: AtomicUsize,
    pathway_detail: AtomicUsize,
    list_known_identifiers: AtomicUsize,
}

#[derive(Default)]
pub struct InMemorySource {
    state: RwLock<State>,
    counters: Counters,
    latency: Option<Duration>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` first, on tokio's clock.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, name: &str, fixture: BeyonderFixture) {
        rw_write(&self.state, SOURCE, "insert")
            .players
            .insert(name.to_string(), fixture);
    }

    /// Known to the listing but without any data, like a player who never
    /// became a beyonder.
    pub fn add_identifier(&self, name: &str) {
        rw_write(&self.state, SOURCE, "add_identifier")
            .extra_identifiers
            .push(name.to_string());
    }

    /// Make every call about `name` fail with `SourceError::Unavailable`.
    pub fn fail_player(&self, name: &str) {
        rw_write(&self.state, SOURCE, "fail_player")
            .failing
            .insert(name.to_string());
    }

    pub fn recover_player(&self, name: &str) {
        rw_write(&self.state, SOURCE, "recover_player")
            .failing
            .remove(name);
    }

    pub fn fail_listing(&self, fail: bool) {
        rw_write(&self.state, SOURCE, "fail_listing").fail_listing = fail;
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            is_tracked: self.counters.is_tracked.load(Ordering::SeqCst),
            progression_map: self.counters.progression_map.load(Ordering::SeqCst),
            pathway_detail: self.counters.pathway_detail.load(Ordering::SeqCst),
            list_known_identifiers: self.counters.list_known_identifiers.load(Ordering::SeqCst),
        }
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn lookup(&self, name: &str) -> Result<Option<BeyonderFixture>, SourceError> {
        let state = rw_read(&self.state, SOURCE, "lookup");
        if state.failing.contains(name) {
            return Err(SourceError::unavailable(format!(
                "injected failure for `{name}`"
            )));
        }
        Ok(state.players.get(name).cloned())
    }
}

#[async_trait]
impl BeyonderSource for InMemorySource {
    async fn is_tracked(&self, name: &str) -> Result<bool, SourceError> {
        self.counters.is_tracked.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self.lookup(name)?.is_some_and(|fixture| fixture.tracked))
    }

    async fn progression_map(&self, name: &str) -> Result<Option<ProgressionMap>, SourceError> {
        self.counters.progression_map.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self.lookup(name)?.map(|fixture| fixture.pathways))
    }

    async fn pathway_detail(
        &self,
        name: &str,
        pathway: &str,
    ) -> Result<Option<PathwayDetail>, SourceError> {
        self.counters.pathway_detail.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self
            .lookup(name)?
            .and_then(|fixture| fixture.details.get(pathway).copied()))
    }

    async fn list_known_identifiers(&self) -> Result<Vec<String>, SourceError> {
        self.counters
            .list_known_identifiers
            .fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        let state = rw_read(&self.state, SOURCE, "list_known_identifiers");
        if state.fail_listing {
            return Err(SourceError::unavailable("injected listing failure"));
        }
        Ok(state
            .players
            .keys()
            .chain(state.extra_identifiers.iter())
            .cloned()
            .collect())
    }
}
