use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "confluo_cache_collection_hit_total",
            Unit::Count,
            "Total number of collection cache hits."
        );
        describe_counter!(
            "confluo_cache_collection_miss_total",
            Unit::Count,
            "Total number of collection cache misses."
        );
        describe_counter!(
            "confluo_cache_slug_hit_total",
            Unit::Count,
            "Total number of per-slug cache hits."
        );
        describe_counter!(
            "confluo_cache_slug_miss_total",
            Unit::Count,
            "Total number of per-slug cache misses."
        );
        describe_counter!(
            "confluo_cache_stale_discard_total",
            Unit::Count,
            "Total number of load results discarded because an invalidation superseded them."
        );
        describe_counter!(
            "confluo_source_failure_total",
            Unit::Count,
            "Total number of per-source fetch failures tolerated during resolution."
        );
        describe_counter!(
            "confluo_documents_skipped_total",
            Unit::Count,
            "Total number of documents skipped because they failed to parse."
        );
        describe_histogram!(
            "confluo_resolve_ms",
            Unit::Milliseconds,
            "Full collection resolution latency in milliseconds."
        );
        describe_histogram!(
            "confluo_search_ms",
            Unit::Milliseconds,
            "Search latency in milliseconds."
        );
    });
}
