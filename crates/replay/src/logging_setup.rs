//! Tracing subscriber for the binary
//!
//! Console output goes to stderr; stdout carries `--list` output and the
//! headless report. With file output on, each run writes one file named after
//! the replayed session.

use anyhow::{Context, Result};
use replay_core::logging::LogConfig;
use std::fs::File;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// Handle to keep the logging worker thread alive
pub struct LogGuard {
    // Flushes the file writer when dropped
    _guard: WorkerGuard,
    path: PathBuf,
}

impl LogGuard {
    /// File this run logs to
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Install the global subscriber
///
/// `session` is the session file being replayed; its stem tags the log file.
pub fn init(config: &LogConfig, session: Option<&Path>) -> Result<Option<LogGuard>> {
    let filter = level_filter(config);

    let console_layer = config.console_output.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .with_target(false)
            .with_filter(filter.clone())
    });

    let (file_layer, guard) = match open_log_file(config, session)? {
        Some((file, path)) => {
            let (writer, worker_guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter);
            (
                Some(layer),
                Some(LogGuard {
                    _guard: worker_guard,
                    path,
                }),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Logging initialized at level: {}", config.level);
    if let Some(guard) = &guard {
        tracing::info!("Log file: {:?}", guard.path());
    }

    Ok(guard)
}

/// RUST_LOG takes precedence over the configured level
fn level_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(config.parse_level().into())
        .from_env_lossy()
}

/// Create this run's log file after pruning old ones
fn open_log_file(config: &LogConfig, session: Option<&Path>) -> Result<Option<(File, PathBuf)>> {
    if !config.file_output {
        return Ok(None);
    }

    config
        .ensure_log_directory()
        .context("Failed to create log directory")?;
    if let Err(e) = config.cleanup_old_logs() {
        // The subscriber is not installed yet
        eprintln!("Warning: Failed to cleanup old log files: {}", e);
    }

    let path = match session.and_then(Path::file_stem).and_then(|s| s.to_str()) {
        Some(stem) => config.session_log_path(stem),
        None => config.current_log_path(),
    };
    let file =
        File::create(&path).with_context(|| format!("Failed to create log file: {:?}", path))?;
    Ok(Some((file, path)))
}
