use lisa_server::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
///
/// The returned guard flushes buffered events when dropped; keep it alive
/// until the process exits.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard, String> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|err| format!("invalid log level {:?}: {err}", config.level))?,
    };

    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(writer)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(writer)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| format!("failed to initialize logging: {err}"))?;

    Ok(guard)
}
