use anyhow::{Context, Result};
use std::fs::File;
use std::path::PathBuf;
use uadmx_core::LogConfig;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// Handle to keep the logging worker thread alive
pub struct LogGuard {
    // Kept alive until dropped
    _guard: WorkerGuard,
}

/// Filter for both layers. `RUST_LOG` overrides the configured level.
fn level_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(config.parse_level().into())
        .from_env_lossy()
}

/// Creates this session's log file inside the log directory
fn open_session_file(config: &LogConfig) -> Result<(File, PathBuf)> {
    let log_path = config.current_log_path();
    let file = File::create(&log_path)
        .with_context(|| format!("cannot create uadmx log file {}", log_path.display()))?;
    Ok((file, log_path))
}

/// Initialize the logging system
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    // 1. Log directory
    config.ensure_log_directory().with_context(|| {
        format!(
            "cannot create uadmx log directory {}",
            config.log_directory.display()
        )
    })?;

    // 2. Retention, before this session's file exists
    let removed = match config.cleanup_old_logs() {
        Ok(removed) => removed,
        Err(e) => {
            eprintln!(
                "uadmx: could not remove old log files in {}: {}",
                config.log_directory.display(),
                e
            );
            0
        }
    };

    let filter = level_filter(config);

    // 3. Console, on stderr so stdout stays free
    let console_layer = config.console_output.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
            .with_filter(filter.clone())
    });

    // 4. Session file
    let (file_layer, guard, log_path) = if config.file_output {
        let (file, log_path) = open_session_file(config)?;
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file);
        eprintln!("uadmx: logging to {}", log_path.display());

        let layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_filter(filter);

        (
            Some(layer),
            Some(LogGuard {
                _guard: worker_guard,
            }),
            Some(log_path),
        )
    } else {
        (None, None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!(level = %config.level, "uadmx logging initialized");
    if let Some(log_path) = log_path {
        tracing::info!(path = %log_path.display(), removed, "uadmx session log opened");
    }

    Ok(guard)
}
