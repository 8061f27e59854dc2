use crate::system_config::LogSettings;
use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE: &str = "polwatch.log";

fn filter(settings: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level))
}

/// Log to stderr only (short-lived commands)
pub fn init_stderr(settings: &LogSettings) -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter(settings))
        .try_init()
        .context("Failed to initialize logging")
}

/// Log to stderr and a daily rolling file in `dir`
///
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init_with_file(settings: &LogSettings, dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter(settings))
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}
