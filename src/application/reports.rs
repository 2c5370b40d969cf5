//! Raw beyonder and artifact data, served without caching.

use reporter_api_types::{ArtifactResponse, BeyonderDataResponse, BeyonderLogsResponse};

use crate::infra::files::DataFiles;

pub const MIN_LOG_LINES: usize = 1;
pub const MAX_LOG_LINES: usize = 10_000;

/// Parse the requested log line count. Non-numeric input is rejected,
/// numeric input is clamped into `MIN_LOG_LINES..=MAX_LOG_LINES`.
pub fn parse_log_amount(raw: &str) -> Option<usize> {
    let amount: i32 = raw.parse().ok()?;
    let clamped = i64::from(amount).clamp(MIN_LOG_LINES as i64, MAX_LOG_LINES as i64);
    usize::try_from(clamped).ok()
}

#[derive(Debug, Clone)]
pub struct ReportService {
    files: DataFiles,
}

impl ReportService {
    pub fn new(files: DataFiles) -> Self {
        Self { files }
    }

    pub async fn beyonder_data(&self, player: &str) -> BeyonderDataResponse {
        let data = self.files.read_beyonder_yaml(player).await;
        BeyonderDataResponse {
            player: player.to_string(),
            found: data.is_some(),
            data,
        }
    }

    pub async fn beyonder_logs(
        &self,
        player: &str,
        raw_amount: &str,
    ) -> BeyonderLogsResponse {
        let Some(amount) = parse_log_amount(raw_amount) else {
            return BeyonderLogsResponse {
                player: player.to_string(),
                requested: 0,
                returned: 0,
                logs: Vec::new(),
                found: false,
            };
        };

        let logs = self.files.read_last_log_lines(player, amount).await;
        BeyonderLogsResponse {
            player: player.to_string(),
            requested: amount,
            returned: logs.len(),
            found: !logs.is_empty(),
            logs,
        }
    }

    pub async fn artifact(&self, artifact_id: &str) -> ArtifactResponse {
        let data = self.files.read_artifact_yaml(artifact_id).await;
        ArtifactResponse {
            artifact_id: artifact_id.to_string(),
            found: data.is_some(),
            data,
        }
    }
}
