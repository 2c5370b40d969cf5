//! Domain layer types and invariants.

pub mod error;
pub mod names;
pub mod pathway;

pub use reporter_api_types::{PathwayRecord, SnapshotRecord};
