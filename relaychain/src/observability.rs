use crate::config::{CommonConfig, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use shared::metrics_defs::describe_all;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const METRICS_PREFIX: &str = "relaychain";

#[derive(thiserror::Error, Debug)]
pub enum ObservabilityError {
    #[error("invalid sentry DSN: {0}")]
    SentryDsn(#[from] sentry::types::ParseDsnError),
    #[error("could not create statsd exporter: {0}")]
    Statsd(#[from] metrics_exporter_statsd::StatsdError),
    #[error("could not install metrics recorder: {0}")]
    Recorder(String),
}

/// Keeps the Sentry client alive. Dropping it flushes pending events.
pub struct Guard {
    _sentry: Option<sentry::ClientInitGuard>,
}

/// Installs the global tracing subscriber and, when configured, Sentry reporting and
/// the StatsD metrics exporter.
pub fn init(common: &CommonConfig) -> Result<Guard, ObservabilityError> {
    let sentry = common.logging.as_ref().map(init_sentry).transpose()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            sentry
                .as_ref()
                .map(|_| sentry::integrations::tracing::layer()),
        )
        .init();

    if let Some(metrics) = &common.metrics {
        init_metrics(metrics)?;
    }

    Ok(Guard { _sentry: sentry })
}

fn init_sentry(logging: &LoggingConfig) -> Result<sentry::ClientInitGuard, ObservabilityError> {
    let dsn: sentry::types::Dsn = logging.sentry_dsn.parse()?;

    Ok(sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        release: sentry::release_name!(),
        ..Default::default()
    }))
}

fn init_metrics(config: &MetricsConfig) -> Result<(), ObservabilityError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some(METRICS_PREFIX))?;
    metrics::set_global_recorder(recorder)
        .map_err(|e| ObservabilityError::Recorder(e.to_string()))?;

    describe_all(relay_stage::metrics_defs::ALL_METRICS);
    describe_all(generator::metrics_defs::ALL_METRICS);

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "sending metrics to statsd"
    );
    Ok(())
}
