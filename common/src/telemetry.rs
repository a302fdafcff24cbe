// Telemetry module for structured logging
//
// The subscriber is installed as the default dispatcher for the lifetime of the
// returned guard instead of being set globally, so each binary opens its log
// sink at start-up and flushes it explicitly when the guard drops at exit.

use crate::config::ObservabilityConfig;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Arc;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the logging sink open; flushes the log file on drop
pub struct LoggingGuard {
    _dispatch: DefaultGuard,
    file: Option<Arc<File>>,
}

impl LoggingGuard {
    /// Flush any buffered log output
    pub fn flush(&self) {
        if let Some(file) = &self.file {
            let _ = (&**file).flush();
            let _ = file.sync_data();
        }
    }
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        self.flush();
    }
}

fn env_filter(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))
}

/// Initialize structured logging to stderr and, optionally, a log file
///
/// - `RUST_LOG` overrides the configured level
/// - JSON or human-readable formatting per configuration
/// - The file sink appends to `<log_dir>/<file_name>`
pub fn init_logging(config: &ObservabilityConfig, file_name: &str) -> Result<LoggingGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let stderr_layer = if config.json_logs {
        fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter(&config.log_level)?)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter(&config.log_level)?)
            .boxed()
    };
    layers.push(stderr_layer);

    let file = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let path = dir.join(file_name);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let file = Arc::new(file);

            let file_layer = if config.json_logs {
                fmt::layer()
                    .json()
                    .with_writer(file.clone())
                    .with_filter(env_filter(&config.log_level)?)
                    .boxed()
            } else {
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(file.clone())
                    .with_filter(env_filter(&config.log_level)?)
                    .boxed()
            };
            layers.push(file_layer);
            Some(file)
        }
        None => None,
    };

    let subscriber = tracing_subscriber::registry().with(layers);
    let dispatch = tracing::subscriber::set_default(subscriber);

    tracing::debug!(
        log_level = %config.log_level,
        json_logs = config.json_logs,
        log_file = file.is_some(),
        "Structured logging initialized"
    );

    Ok(LoggingGuard {
        _dispatch: dispatch,
        file,
    })
}
