//! Single-slot holder for the whole-population snapshot.

use std::sync::{Arc, RwLock};

use crate::domain::SnapshotRecord;
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::snapshot";

/// Readers get either the previous complete snapshot or nothing; the slot is
/// only ever swapped as a whole.
#[derive(Default)]
pub struct SnapshotCache {
    slot: RwLock<Option<Arc<SnapshotRecord>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> Option<Arc<SnapshotRecord>> {
        rw_read(&self.slot, SOURCE, "read").clone()
    }

    pub fn replace(&self, snapshot: SnapshotRecord) -> Arc<SnapshotRecord> {
        let snapshot = Arc::new(snapshot);
        *rw_write(&self.slot, SOURCE, "replace") = Some(Arc::clone(&snapshot));
        snapshot
    }

    pub fn clear(&self) {
        *rw_write(&self.slot, SOURCE, "clear") = None;
    }
}
