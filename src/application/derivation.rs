//! Turns raw source data for one player into the cached `PathwayRecord`.

use tracing::warn;

use crate::application::source::{BeyonderSource, SourceError};
use crate::domain::PathwayRecord;
use crate::domain::pathway::{PathwayDetail, ProgressionMap};

/// Derive the pathway report for `name`.
///
/// Players the source does not track, or tracks without any pathway data,
/// produce a not-tracked record. Source failures are returned as-is so callers
/// can tell them apart from a legitimate not-tracked answer.
pub async fn derive_pathway(
    name: &str,
    source: &dyn BeyonderSource,
) -> Result<PathwayRecord, SourceError> {
    if !source.is_tracked(name).await? {
        return Ok(PathwayRecord::not_tracked(name));
    }

    let Some(pathways) = source.progression_map(name).await? else {
        return Ok(PathwayRecord::not_tracked(name));
    };
    let Some(primary) = primary_pathway(&pathways) else {
        return Ok(PathwayRecord::not_tracked(name));
    };

    let Some(detail) = source.pathway_detail(name, primary).await? else {
        warn!(
            player = name,
            pathway = primary,
            "source listed a pathway without detail; reporting as not tracked"
        );
        return Ok(PathwayRecord::not_tracked(name));
    };

    Ok(PathwayRecord::tracked(
        name,
        primary,
        detail.lowest_sequence_level.to_string(),
        acting_progress(&detail),
    ))
}

/// The pathway with the lowest sequence ordinal; ties go to the first entry.
pub fn primary_pathway(pathways: &ProgressionMap) -> Option<&str> {
    pathways
        .iter()
        .min_by_key(|(_, sequence)| **sequence)
        .map(|(name, _)| name.as_str())
}

/// `acting / needed_acting`, or `"0"` when nothing is needed.
pub fn acting_progress(detail: &PathwayDetail) -> String {
    if detail.needed_acting == 0.0 {
        return "0".to_string();
    }
    format_ratio(detail.acting / detail.needed_acting)
}

// Dashboards parse the Java-style rendering: whole numbers keep a trailing
// `.0`, and magnitudes outside `[1e-3, 1e7)` switch to `d.dddE±n`.
fn format_ratio(value: f64) -> String {
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value.is_nan() {
        return "NaN".to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-3..1e7).contains(&magnitude) {
        return scientific(value);
    }
    if value.fract() == 0.0 {
        return format!("{value:.1}");
    }
    value.to_string()
}

fn scientific(value: f64) -> String {
    let rendered = format!("{value:e}");
    let (mantissa, exponent) = rendered.split_once('e').unwrap_or((&rendered, "0"));
    if mantissa.contains('.') {
        format!("{mantissa}E{exponent}")
    } else {
        format!("{mantissa}.0E{exponent}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::source::{BeyonderFixture, InMemorySource};

    fn detail(lowest: i32, acting: f64, needed: f64) -> PathwayDetail {
        PathwayDetail {
            lowest_sequence_level: lowest,
            acting,
            needed_acting: needed,
        }
    }

    #[test]
    fn primary_pathway_prefers_first_minimum() {
        let mut pathways = ProgressionMap::new();
        pathways.insert("A".to_string(), 2);
        pathways.insert("B".to_string(), 1);
        pathways.insert("C".to_string(), 1);
        assert_eq!(primary_pathway(&pathways), Some("B"));

        let mut reordered = ProgressionMap::new();
        reordered.insert("C".to_string(), 1);
        reordered.insert("A".to_string(), 2);
        reordered.insert("B".to_string(), 1);
        assert_eq!(primary_pathway(&reordered), Some("C"));
    }

    #[test]
    fn primary_pathway_of_empty_map_is_none() {
        assert_eq!(primary_pathway(&ProgressionMap::new()), None);
    }

    #[test]
    fn acting_progress_formats_like_the_dashboard_expects() {
        assert_eq!(acting_progress(&detail(7, 5.0, 0.0)), "0");
        assert_eq!(acting_progress(&detail(7, 5.0, 10.0)), "0.5");
        assert_eq!(acting_progress(&detail(7, 10.0, 10.0)), "1.0");
        assert_eq!(acting_progress(&detail(7, 1.0, 3.0)), "0.3333333333333333");
        assert_eq!(acting_progress(&detail(7, 0.0, 4.0)), "0.0");
    }

    #[test]
    fn acting_progress_switches_to_exponent_outside_plain_range() {
        assert_eq!(acting_progress(&detail(7, 1.0, 10_000.0)), "1.0E-4");
        assert_eq!(acting_progress(&detail(7, 0.5, 1000.0)), "5.0E-4");
        assert_eq!(acting_progress(&detail(7, 1.0, 1000.0)), "0.001");
        assert_eq!(acting_progress(&detail(7, 1e7, 1.0)), "1.0E7");
        assert_eq!(acting_progress(&detail(7, 12_500_000.0, 1.0)), "1.25E7");
        assert_eq!(acting_progress(&detail(7, 9_999_999.0, 1.0)), "9999999.0");
        assert_eq!(acting_progress(&detail(7, -1.0, 10_000.0)), "-1.0E-4");
    }

    #[tokio::test]
    async fn untracked_player_has_no_derived_fields() {
        let source = InMemorySource::new();
        source.insert("Steve", BeyonderFixture::untracked());

        let record = derive_pathway("Steve", &source).await.expect("derive");
        assert!(!record.is_beyonder());
        assert_eq!(record.pathway(), None);
        assert_eq!(record.sequence(), None);
        assert_eq!(record.acting(), None);
    }

    #[tokio::test]
    async fn unknown_player_is_not_tracked() {
        let source = InMemorySource::new();
        let record = derive_pathway("Nobody", &source).await.expect("derive");
        assert_eq!(record, PathwayRecord::not_tracked("Nobody"));
    }

    #[tokio::test]
    async fn tracked_player_without_pathways_degrades() {
        let source = InMemorySource::new();
        source.insert("Alex", BeyonderFixture::tracked());

        let record = derive_pathway("Alex", &source).await.expect("derive");
        assert_eq!(record, PathwayRecord::not_tracked("Alex"));
    }

    #[tokio::test]
    async fn tracked_player_reports_primary_pathway() {
        let source = InMemorySource::new();
        source.insert(
            "Klein",
            BeyonderFixture::tracked()
                .pathway("Seer", 5, detail(5, 5.0, 10.0))
                .pathway("Fool", 5, detail(4, 1.0, 1.0))
                .pathway("Sun", 9, detail(9, 0.0, 1.0)),
        );

        let record = derive_pathway("Klein", &source).await.expect("derive");
        assert_eq!(record, PathwayRecord::tracked("Klein", "Seer", "5", "0.5"));
    }

    #[tokio::test]
    async fn missing_detail_degrades() {
        let source = InMemorySource::new();
        source.insert(
            "Audrey",
            BeyonderFixture::tracked().pathway_without_detail("Spectator", 8),
        );

        let record = derive_pathway("Audrey", &source).await.expect("derive");
        assert!(!record.is_beyonder());
    }

    #[tokio::test]
    async fn source_failure_is_not_a_not_tracked_result() {
        let source = InMemorySource::new();
        source.insert("Leonard", BeyonderFixture::tracked());
        source.fail_player("Leonard");

        let err = derive_pathway("Leonard", &source)
            .await
            .expect_err("source failure surfaces");
        assert!(matches!(err, SourceError::Unavailable(_)));
    }
}
