//! Read-only view of the authoritative beyonder data source.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::pathway::{PathwayDetail, ProgressionMap};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("beyonder source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed data for `{name}`: {detail}")]
    Malformed { name: String, detail: String },
}

impl SourceError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub fn malformed(name: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Self::Malformed {
            name: name.into(),
            detail: detail.to_string(),
        }
    }
}

/// Narrow query surface the cache layer needs from the data source.
///
/// Every call may be expensive; callers are expected to cache results.
#[async_trait]
pub trait BeyonderSource: Send + Sync {
    /// Whether the source reports active progression data for `name`.
    async fn is_tracked(&self, name: &str) -> Result<bool, SourceError>;

    /// Pathway name to sequence ordinal, `None` when the source has no data.
    async fn progression_map(&self, name: &str) -> Result<Option<ProgressionMap>, SourceError>;

    async fn pathway_detail(
        &self,
        name: &str,
        pathway: &str,
    ) -> Result<Option<PathwayDetail>, SourceError>;

    /// Every player name the source knows about, tracked or not.
    async fn list_known_identifiers(&self) -> Result<Vec<String>, SourceError>;
}
