//! Raw data files served next to the pathway reports.
//!
//! Every name passes through [`names::file_stem`] before it is joined onto a
//! directory; names with nothing usable left read as missing.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::domain::names;

#[derive(Debug, Clone)]
pub struct DataFiles {
    beyonders_dir: PathBuf,
    logs_dir: PathBuf,
    artifacts_dir: PathBuf,
}

impl DataFiles {
    pub fn new(
        beyonders_dir: impl Into<PathBuf>,
        logs_dir: impl Into<PathBuf>,
        artifacts_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            beyonders_dir: beyonders_dir.into(),
            logs_dir: logs_dir.into(),
            artifacts_dir: artifacts_dir.into(),
        }
    }

    pub fn from_settings(settings: &crate::config::SourceSettings) -> Self {
        Self::new(
            settings.beyonders_dir.clone(),
            settings.logs_dir.clone(),
            settings.artifacts_dir.clone(),
        )
    }

    /// `<beyonders_dir>/<player>.yml`, verbatim.
    pub async fn read_beyonder_yaml(&self, player: &str) -> Option<String> {
        read_text(&self.beyonders_dir, player, "yml").await
    }

    /// `<artifacts_dir>/<id>.yml`, verbatim.
    pub async fn read_artifact_yaml(&self, artifact_id: &str) -> Option<String> {
        read_text(&self.artifacts_dir, artifact_id, "yml").await
    }

    /// Up to `count` trailing lines of `<logs_dir>/<player>.log`, oldest first.
    /// Bytes that are not UTF-8 are replaced rather than failing the read.
    pub async fn read_last_log_lines(&self, player: &str, count: usize) -> Vec<String> {
        let Some(bytes) = read_bytes(&self.logs_dir, player, "log").await else {
            return Vec::new();
        };

        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(count);
        lines[start..].iter().map(|line| line.to_string()).collect()
    }
}

async fn read_text(dir: &Path, name: &str, extension: &str) -> Option<String> {
    let bytes = read_bytes(dir, name, extension).await?;
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(err) => {
            error!(
                target = "reporter::files",
                name,
                extension,
                error = %err,
                "data file is not valid UTF-8; reporting as missing"
            );
            None
        }
    }
}

/// Missing files, unusable names and unreadable paths all read as absent.
async fn read_bytes(dir: &Path, name: &str, extension: &str) -> Option<Vec<u8>> {
    let stem = names::file_stem(name).ok()?;
    let path = dir.join(format!("{stem}.{extension}"));

    match tokio::fs::read(&path).await {
        Ok(bytes) => Some(bytes),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(target = "reporter::files", path = %path.display(), "file not found");
            None
        }
        Err(err) => {
            error!(
                target = "reporter::files",
                path = %path.display(),
                error = %err,
                "failed to read data file; reporting as missing"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(root: &Path) -> DataFiles {
        for dir in ["beyonders", "logs", "artifacts"] {
            std::fs::create_dir_all(root.join(dir)).expect("mkdir");
        }
        DataFiles::new(
            root.join("beyonders"),
            root.join("logs"),
            root.join("artifacts"),
        )
    }

    #[tokio::test]
    async fn reads_yaml_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let files = files(dir.path());
        std::fs::write(dir.path().join("beyonders/Klein.yml"), "tracked: true\n").expect("write");

        let text = files.read_beyonder_yaml("Klein").await;
        assert_eq!(text.as_deref(), Some("tracked: true\n"));
        assert_eq!(files.read_beyonder_yaml("Amon").await, None);
    }

    #[tokio::test]
    async fn traversal_is_sanitized() {
        let dir = tempfile::tempdir().expect("tempdir");
        let files = files(dir.path());
        std::fs::write(dir.path().join("artifacts/secret.yml"), "x: 1\n").expect("write");

        // `../artifacts/secret` collapses to `artifactssecret`, which does not exist.
        assert_eq!(files.read_beyonder_yaml("../artifacts/secret").await, None);
        assert_eq!(files.read_artifact_yaml("/..").await, None);
    }

    #[tokio::test]
    async fn log_tail_returns_last_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let files = files(dir.path());
        std::fs::write(dir.path().join("logs/Klein.log"), "one\ntwo\nthree\n").expect("write");

        assert_eq!(
            files.read_last_log_lines("Klein", 2).await,
            vec!["two", "three"]
        );
        assert_eq!(files.read_last_log_lines("Klein", 10).await.len(), 3);
        assert!(files.read_last_log_lines("Nobody", 5).await.is_empty());
    }

    #[tokio::test]
    async fn unreadable_files_read_as_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let files = files(dir.path());
        std::fs::create_dir(dir.path().join("beyonders/Klein.yml")).expect("mkdir");
        std::fs::write(dir.path().join("artifacts/relic.yml"), b"grade: \xff\n").expect("write");

        assert_eq!(files.read_beyonder_yaml("Klein").await, None);
        assert_eq!(files.read_artifact_yaml("relic").await, None);
    }

    #[tokio::test]
    async fn log_tail_replaces_invalid_utf8() {
        let dir = tempfile::tempdir().expect("tempdir");
        let files = files(dir.path());
        std::fs::write(dir.path().join("logs/Klein.log"), b"one\n\xff\xfe\nthree\n")
            .expect("write");

        let lines = files.read_last_log_lines("Klein", 10).await;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "\u{FFFD}\u{FFFD}");
        assert_eq!(lines[2], "three");
    }
}
