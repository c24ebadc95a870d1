use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{
    METRIC_EVICT_TOTAL, METRIC_EXPIRED_TOTAL, METRIC_HIT_TOTAL, METRIC_INVALIDATED_TOTAL,
    METRIC_MISS_TOTAL, METRIC_STALE_HIT_TOTAL,
};
use crate::config::{LogFormat, LoggingSettings};
use crate::error::Error;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), Error> {
    describe_metrics();

    let directive = logging.level.parse().map_err(|err| {
        Error::telemetry(format!("invalid log level '{}': {err}", logging.level))
    })?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
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
        .map_err(|err| Error::telemetry(format!("failed to install tracing subscriber: {err}")))
}

pub(crate) fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HIT_TOTAL,
            Unit::Count,
            "Total number of fresh cache hits."
        );
        describe_counter!(
            METRIC_STALE_HIT_TOTAL,
            Unit::Count,
            "Total number of hits served within the stale grace window."
        );
        describe_counter!(METRIC_MISS_TOTAL, Unit::Count, "Total number of cache misses.");
        describe_counter!(
            METRIC_EVICT_TOTAL,
            Unit::Count,
            "Total number of cache evictions due to capacity."
        );
        describe_counter!(
            METRIC_EXPIRED_TOTAL,
            Unit::Count,
            "Total number of entries purged after TTL and grace expiry."
        );
        describe_counter!(
            METRIC_INVALIDATED_TOTAL,
            Unit::Count,
            "Total number of entries removed by tag invalidation."
        );
    });
}
