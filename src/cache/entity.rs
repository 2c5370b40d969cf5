//! Per-player cache: LRU bounded, entries expire a fixed time after insertion.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::Duration;

use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;

use crate::domain::PathwayRecord;
use crate::util::lock::rw_write;

const SOURCE: &str = "cache::entity";

pub(crate) const METRIC_ENTITY_HIT: &str = "reporter_cache_entity_hit_total";
pub(crate) const METRIC_ENTITY_MISS: &str = "reporter_cache_entity_miss_total";
pub(crate) const METRIC_ENTITY_EVICT: &str = "reporter_cache_entity_evict_total";

struct Entry {
    record: PathwayRecord,
    inserted_at: Instant,
}

impl Entry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

pub struct EntityCache {
    ttl: Duration,
    entries: RwLock<LruCache<String, Entry>>,
}

impl EntityCache {
    pub fn new(ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            ttl,
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Fresh record for `name`. Expired entries are dropped on the way.
    pub fn get(&self, name: &str) -> Option<PathwayRecord> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");

        let expired = match entries.get(name) {
            Some(entry) if entry.is_fresh(now, self.ttl) => {
                let record = entry.record.clone();
                counter!(METRIC_ENTITY_HIT).increment(1);
                return Some(record);
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(name);
        }
        counter!(METRIC_ENTITY_MISS).increment(1);
        None
    }

    pub fn put(&self, name: &str, record: PathwayRecord) {
        let entry = Entry {
            record,
            inserted_at: Instant::now(),
        };
        let displaced = rw_write(&self.entries, SOURCE, "put").push(name.to_string(), entry);
        // `push` also hands back the old value when the key was already present.
        if displaced.is_some_and(|(key, _)| key != name) {
            counter!(METRIC_ENTITY_EVICT).increment(1);
        }
    }

    pub fn invalidate(&self, name: &str) {
        rw_write(&self.entries, SOURCE, "invalidate").pop(name);
    }

    pub fn invalidate_all(&self) {
        rw_write(&self.entries, SOURCE, "invalidate_all").clear();
    }

    /// Live entries after dropping the expired ones; never above capacity.
    pub fn estimated_size(&self) -> usize {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "estimated_size");

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(now, self.ttl))
            .map(|(name, _)| name.clone())
            .collect();
        for name in &expired {
            entries.pop(name);
        }
        entries.len()
    }
}
