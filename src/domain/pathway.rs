//! Raw progression data as reported by a beyonder source.

use indexmap::IndexMap;

/// Pathway name to sequence ordinal, in the order the source reported them.
///
/// Lower ordinals are more advanced. Iteration order matters: when several
/// pathways share the lowest ordinal the first one wins.
pub type ProgressionMap = IndexMap<String, i32>;

/// Detailed progress along a single pathway.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathwayDetail {
    pub lowest_sequence_level: i32,
    pub acting: f64,
    pub needed_acting: f64,
}
