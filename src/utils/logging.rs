// src/utils/logging.rs
use anyhow::{Context, Result};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Keeps the file writer flushing. Hold it until the process exits.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

fn filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Stdout logging, plus a daily-rotated non-blocking file when
/// `config.directory` is set. `RUST_LOG` overrides `config.level`.
pub fn init_tracing(config: &LoggingConfig) -> Result<LogGuard> {
    let stdout_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(filter(&config.level));

    let (file_layer, file_guard) = match &config.directory {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_filter(filter(&config.level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}
