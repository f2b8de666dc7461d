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

pub const NODES_CONVERTED_TOTAL: &str = "epubmath_nodes_converted_total";
pub const NODE_FAILURES_TOTAL: &str = "epubmath_node_failures_total";
pub const DOCUMENTS_CHANGED_TOTAL: &str = "epubmath_documents_changed_total";
pub const PIPELINE_MS: &str = "epubmath_pipeline_ms";

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so stdout stays reserved for the run summary.
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
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
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
            NODES_CONVERTED_TOTAL,
            Unit::Count,
            "Total number of math nodes replaced by rendered output."
        );
        describe_counter!(
            NODE_FAILURES_TOTAL,
            Unit::Count,
            "Total number of math nodes left verbatim after a render failure."
        );
        describe_counter!(
            DOCUMENTS_CHANGED_TOTAL,
            Unit::Count,
            "Total number of documents rewritten on disk."
        );
        describe_histogram!(
            PIPELINE_MS,
            Unit::Milliseconds,
            "End-to-end pipeline latency in milliseconds."
        );
    });
}
