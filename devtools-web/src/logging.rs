//! Tracing subscriber setup.

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Install the global subscriber. `log` records from the toolbox are
/// bridged in as well.
///
/// The returned guard flushes the log file on drop; keep it alive in `main`.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json())
            .with(file_writer.map(|writer| fmt::layer().json().with_writer(writer)))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer())
            .with(file_writer.map(|writer| fmt::layer().with_ansi(false).with_writer(writer)))
            .try_init(),
    }
    .context("Failed to initialize logging")?;

    Ok(guard)
}
