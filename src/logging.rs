//! Logging setup for Courier using tracing.

use anyhow::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

const DEFAULT_FILTER: &str = "info,courier=debug";

/// Install the console + daily-rolling file subscriber.
///
/// `RUST_LOG` wins over `config.filter`. The returned guard flushes the
/// file writer on drop; keep it alive for the lifetime of the process.
pub fn init(config: &LoggingConfig) -> Result<(WorkerGuard, PathBuf)> {
    let log_dir = log_dir(config)?;
    std::fs::create_dir_all(&log_dir)?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "courier.log"));

    tracing_subscriber::registry()
        .with(filter(config)?)
        .with(
            fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    tracing::debug!("Log directory: {}", log_dir.display());
    Ok((guard, log_dir))
}

fn filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = config.filter.as_deref().unwrap_or(DEFAULT_FILTER);
    Ok(EnvFilter::try_new(directives)?)
}

fn log_dir(config: &LoggingConfig) -> Result<PathBuf> {
    if let Some(dir) = &config.dir {
        return Ok(dir.clone());
    }
    let dirs = directories::ProjectDirs::from("com", "courier", "courier")
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(dirs.data_dir().join("logs"))
}
