//! Shared response types for the beyonder reporter.
//!
//! The server serializes these, the CLI deserializes them. Field names match
//! the JSON contract consumed by existing dashboards.

use serde::{Deserialize, Serialize};

/// Pathway report for a single player.
///
/// Built only through [`PathwayRecord::not_tracked`] and
/// [`PathwayRecord::tracked`], so the derived fields are either all present
/// or all `null`. Deserialization enforces the same rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PathwayWire")]
pub struct PathwayRecord {
    player: String,
    beyonder: bool,
    pathway: Option<String>,
    sequence: Option<String>,
    acting: Option<String>,
}

impl PathwayRecord {
    pub fn not_tracked(player: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            beyonder: false,
            pathway: None,
            sequence: None,
            acting: None,
        }
    }

    pub fn tracked(
        player: impl Into<String>,
        pathway: impl Into<String>,
        sequence: impl Into<String>,
        acting: impl Into<String>,
    ) -> Self {
        Self {
            player: player.into(),
            beyonder: true,
            pathway: Some(pathway.into()),
            sequence: Some(sequence.into()),
            acting: Some(acting.into()),
        }
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    pub fn is_beyonder(&self) -> bool {
        self.beyonder
    }

    pub fn pathway(&self) -> Option<&str> {
        self.pathway.as_deref()
    }

    pub fn sequence(&self) -> Option<&str> {
        self.sequence.as_deref()
    }

    pub fn acting(&self) -> Option<&str> {
        self.acting.as_deref()
    }
}

#[derive(Deserialize)]
struct PathwayWire {
    player: String,
    beyonder: bool,
    pathway: Option<String>,
    sequence: Option<String>,
    acting: Option<String>,
}

impl TryFrom<PathwayWire> for PathwayRecord {
    type Error = String;

    fn try_from(wire: PathwayWire) -> Result<Self, Self::Error> {
        match (wire.beyonder, wire.pathway, wire.sequence, wire.acting) {
            (true, Some(pathway), Some(sequence), Some(acting)) => {
                Ok(Self::tracked(wire.player, pathway, sequence, acting))
            }
            (false, None, None, None) => Ok(Self::not_tracked(wire.player)),
            (true, ..) => Err(format!(
                "beyonder record for {} is missing pathway, sequence or acting",
                wire.player
            )),
            (false, ..) => Err(format!(
                "non-beyonder record for {} carries pathway fields",
                wire.player
            )),
        }
    }
}

/// Pathway reports for every tracked player known at computation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotWire")]
pub struct SnapshotRecord {
    amount: usize,
    beyonders: Vec<PathwayRecord>,
}

impl SnapshotRecord {
    pub fn new(beyonders: Vec<PathwayRecord>) -> Self {
        Self {
            amount: beyonders.len(),
            beyonders,
        }
    }

    pub fn amount(&self) -> usize {
        self.amount
    }

    pub fn beyonders(&self) -> &[PathwayRecord] {
        &self.beyonders
    }
}

#[derive(Deserialize)]
struct SnapshotWire {
    amount: usize,
    beyonders: Vec<PathwayRecord>,
}

impl TryFrom<SnapshotWire> for SnapshotRecord {
    type Error = String;

    fn try_from(wire: SnapshotWire) -> Result<Self, Self::Error> {
        if wire.amount != wire.beyonders.len() {
            return Err(format!(
                "snapshot amount {} does not match {} beyonders",
                wire.amount,
                wire.beyonders.len()
            ));
        }
        Ok(Self::new(wire.beyonders))
    }
}

/// Raw YAML data file for a beyonder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeyonderDataResponse {
    pub player: String,
    pub data: Option<String>,
    pub found: bool,
}

/// Tail of a beyonder's activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeyonderLogsResponse {
    pub player: String,
    pub requested: usize,
    pub returned: usize,
    pub logs: Vec<String>,
    pub found: bool,
}

/// Raw YAML data file for an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactResponse {
    #[serde(rename = "artifactId")]
    pub artifact_id: String,
    pub data: Option<String>,
    pub found: bool,
}

/// Cache occupancy as reported by the admin `stats` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatsResponse {
    pub player_entries: usize,
    pub everyone_entries: usize,
    pub snapshot_cached: bool,
    pub refresh_interval_minutes: i64,
    pub scheduler_running: bool,
}

/// Textual admin command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub args: Vec<String>,
}

/// Lines printed back to the operator after an admin command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub lines: Vec<String>,
}
