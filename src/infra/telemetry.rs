use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::metric_names::{
    METRIC_ENTITY_EVICT, METRIC_ENTITY_HIT, METRIC_ENTITY_MISS, METRIC_REBUILD_FAILED,
    METRIC_REBUILD_MS, METRIC_SNAPSHOT_BEYONDERS,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_ENTITY_HIT,
            Unit::Count,
            "Total number of entity cache hits."
        );
        describe_counter!(
            METRIC_ENTITY_MISS,
            Unit::Count,
            "Total number of entity cache misses, expired entries included."
        );
        describe_counter!(
            METRIC_ENTITY_EVICT,
            Unit::Count,
            "Total number of entity cache evictions due to capacity."
        );
        describe_counter!(
            METRIC_REBUILD_FAILED,
            Unit::Count,
            "Total number of snapshot rebuilds that failed and kept the previous snapshot."
        );
        describe_histogram!(
            METRIC_REBUILD_MS,
            Unit::Milliseconds,
            "Snapshot rebuild latency in milliseconds."
        );
        describe_gauge!(
            METRIC_SNAPSHOT_BEYONDERS,
            Unit::Count,
            "Tracked beyonders in the most recent snapshot."
        );
    });
}
