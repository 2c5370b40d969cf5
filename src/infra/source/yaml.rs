//! Beyonder data stored as one YAML document per player.
//!
//! ```yaml
//! tracked: true
//! pathways:
//!   Seer:
//!     sequence: 7
//!     lowest_sequence: 7
//!     acting: 120.0
//!     needed_acting: 400.0
//! ```
//!
//! Pathway order in the file is the order used for tie-breaking.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::application::source::{BeyonderSource, SourceError};
use crate::domain::names;
use crate::domain::pathway::{PathwayDetail, ProgressionMap};

const DATA_EXTENSION: &str = "yml";

#[derive(Debug, Deserialize)]
struct BeyonderDocument {
    #[serde(default = "default_tracked")]
    tracked: bool,
    #[serde(default)]
    pathways: IndexMap<String, PathwayEntry>,
}

#[derive(Debug, Deserialize)]
struct PathwayEntry {
    sequence: i32,
    #[serde(default)]
    lowest_sequence: Option<i32>,
    #[serde(default)]
    acting: f64,
    #[serde(default)]
    needed_acting: f64,
}

fn default_tracked() -> bool {
    true
}

/// Reads `<dir>/<player>.yml` on every call.
#[derive(Debug, Clone)]
pub struct YamlDirectorySource {
    dir: PathBuf,
}

impl YamlDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn load(&self, name: &str) -> Result<Option<BeyonderDocument>, SourceError> {
        // Names that would need sanitizing could alias another player's file.
        if !names::is_clean(name) {
            debug!(player = name, "skipping lookup for unclean player name");
            return Ok(None);
        }

        let path = self.dir.join(format!("{name}.{DATA_EXTENSION}"));
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(SourceError::unavailable(format!(
                    "failed to read {}: {err}",
                    path.display()
                )));
            }
        };

        serde_yaml::from_str(&text)
            .map(Some)
            .map_err(|err| SourceError::malformed(name, err))
    }
}

#[async_trait]
impl BeyonderSource for YamlDirectorySource {
    async fn is_tracked(&self, name: &str) -> Result<bool, SourceError> {
        Ok(self.load(name).await?.is_some_and(|doc| doc.tracked))
    }

    async fn progression_map(&self, name: &str) -> Result<Option<ProgressionMap>, SourceError> {
        Ok(self.load(name).await?.map(|doc| {
            doc.pathways
                .into_iter()
                .map(|(pathway, entry)| (pathway, entry.sequence))
                .collect()
        }))
    }

    async fn pathway_detail(
        &self,
        name: &str,
        pathway: &str,
    ) -> Result<Option<PathwayDetail>, SourceError> {
        let Some(doc) = self.load(name).await? else {
            return Ok(None);
        };
        Ok(doc.pathways.get(pathway).map(|entry| PathwayDetail {
            lowest_sequence_level: entry.lowest_sequence.unwrap_or(entry.sequence),
            acting: entry.acting,
            needed_acting: entry.needed_acting,
        }))
    }

    async fn list_known_identifiers(&self) -> Result<Vec<String>, SourceError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|err| {
            SourceError::unavailable(format!("failed to list {}: {err}", self.dir.display()))
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(SourceError::unavailable)?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DATA_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).expect("write fixture");
    }

    #[tokio::test]
    async fn reads_pathways_in_file_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            dir.path(),
            "Klein.yml",
            "pathways:\n  Fool:\n    sequence: 5\n    lowest_sequence: 4\n    acting: 1.0\n    needed_acting: 2.0\n  Seer:\n    sequence: 5\n    acting: 3.0\n    needed_acting: 4.0\n",
        );
        let source = YamlDirectorySource::new(dir.path());

        assert!(source.is_tracked("Klein").await.expect("tracked"));
        let map = source
            .progression_map("Klein")
            .await
            .expect("map")
            .expect("present");
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["Fool", "Seer"]);

        let fool = source
            .pathway_detail("Klein", "Fool")
            .await
            .expect("detail")
            .expect("present");
        assert_eq!(fool.lowest_sequence_level, 4);

        let seer = source
            .pathway_detail("Klein", "Seer")
            .await
            .expect("detail")
            .expect("present");
        assert_eq!(seer.lowest_sequence_level, 5);
    }

    #[tokio::test]
    async fn missing_and_unclean_names_are_untracked() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "Amy.yml", "tracked: true\n");
        let source = YamlDirectorySource::new(dir.path());

        assert!(!source.is_tracked("Nobody").await.expect("lookup"));
        assert!(!source.is_tracked("../Amy").await.expect("lookup"));
        assert!(source.progression_map("Nobody").await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn malformed_yaml_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "Broken.yml", "pathways: [not, a, map]\n");
        let source = YamlDirectorySource::new(dir.path());

        let err = source.is_tracked("Broken").await.expect_err("malformed");
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[tokio::test]
    async fn lists_only_data_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "b.yml", "tracked: false\n");
        write(dir.path(), "a.yml", "tracked: true\n");
        write(dir.path(), "notes.txt", "ignored");
        let source = YamlDirectorySource::new(dir.path());

        assert_eq!(
            source.list_known_identifiers().await.expect("list"),
            vec!["a", "b"]
        );
    }

    #[tokio::test]
    async fn missing_directory_is_unavailable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = YamlDirectorySource::new(dir.path().join("absent"));

        let err = source.list_known_identifiers().await.expect_err("missing");
        assert!(matches!(err, SourceError::Unavailable(_)));
    }
}
