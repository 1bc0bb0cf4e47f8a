use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::TelemetryConfig;

/// Initialize structured logging.
///
/// `RUST_LOG` overrides the default filter. With `json_logs` each event is a
/// JSON line, otherwise compact human-readable output. Calling this twice is
/// harmless (the second call is ignored), which matters for tests and the
/// embedded runtime.
pub fn init(config: &TelemetryConfig) {
    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,recallbricks_local=debug,tower_http=info"));

    let (json_layer, compact_layer) = if config.json_logs {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_target(true),
            ),
            None,
        )
    } else {
        (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .compact(),
            ),
        )
    };

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(json_layer)
        .with(compact_layer)
        .try_init();
}

/// Install the global Prometheus recorder and return its render handle.
pub fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    Ok(handle)
}
