//! Logging configuration
//!
//! Settings for the console and file log outputs. The subscriber itself is
//! installed by the binary; this module only holds what it needs to know.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;

/// Prefix of every log file name
pub const LOG_FILE_PREFIX: &str = "motion-replay";

/// Timestamp of this process, shared by every call to `current_log_path`
static SESSION_STAMP: Lazy<String> =
    Lazy::new(|| chrono::Local::now().format("%Y%m%d_%H%M%S").to_string());

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level name: trace, debug, info, warn, error
    pub level: String,
    /// Directory holding log files
    pub log_path: PathBuf,
    /// Number of log files kept on disk
    pub max_files: usize,
    /// Write to stderr
    pub console_output: bool,
    /// Write to a file in `log_path`
    pub file_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_path: default_log_dir(),
            max_files: 10,
            console_output: true,
            file_output: false,
        }
    }
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("MotionReplay").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

impl LogConfig {
    /// Config with the given level and defaults elsewhere
    pub fn with_level(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// Level filter for the configured name, INFO when unrecognised
    pub fn parse_level(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::OFF,
            "error" => LevelFilter::ERROR,
            "warn" | "warning" => LevelFilter::WARN,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            _ => LevelFilter::INFO,
        }
    }

    /// Create the log directory if file output is enabled
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_path)?;
        }
        Ok(())
    }

    /// Log file of the running process
    pub fn current_log_path(&self) -> PathBuf {
        self.log_path
            .join(format!("{}_{}.log", LOG_FILE_PREFIX, *SESSION_STAMP))
    }

    /// Log file of the running process, tagged with the replayed session
    ///
    /// `session` is usually the session file stem. Characters outside
    /// `[A-Za-z0-9_-]` become `-`; an empty tag falls back to the plain name.
    pub fn session_log_path(&self, session: &str) -> PathBuf {
        let tag: String = session
            .trim()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        if tag.is_empty() {
            return self.current_log_path();
        }
        self.log_path
            .join(format!("{}_{}_{}.log", LOG_FILE_PREFIX, *SESSION_STAMP, tag))
    }

    /// Delete the oldest log files beyond `max_files`
    ///
    /// Returns the number of files removed.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.log_path.exists() {
            return Ok(0);
        }

        let mut logs: Vec<PathBuf> = fs::read_dir(&self.log_path)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "log")
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
            })
            .collect();

        if logs.len() <= self.max_files {
            return Ok(0);
        }

        // Stamped names sort chronologically
        logs.sort();
        let excess = logs.len() - self.max_files;
        let mut removed = 0;
        for path in logs.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Failed to remove old log {:?}: {}", path, e),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(LogConfig::with_level("debug").parse_level(), LevelFilter::DEBUG);
        assert_eq!(LogConfig::with_level(" WARN ").parse_level(), LevelFilter::WARN);
        assert_eq!(LogConfig::with_level("verbose").parse_level(), LevelFilter::INFO);
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        for stamp in ["20250101_000000", "20250102_000000", "20250103_000000"] {
            let name = format!("{}_{}.log", LOG_FILE_PREFIX, stamp);
            fs::write(dir.path().join(name), "x").unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        let config = LogConfig {
            log_path: dir.path().to_path_buf(),
            max_files: 2,
            file_output: true,
            ..Default::default()
        };
        assert_eq!(config.cleanup_old_logs().unwrap(), 1);
        assert!(!dir
            .path()
            .join(format!("{}_20250101_000000.log", LOG_FILE_PREFIX))
            .exists());
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[test]
    fn test_session_log_path_is_tagged() {
        let config = LogConfig::default();
        let path = config.session_log_path("squat day 3/4");
        let name = path.file_name().unwrap().to_str().unwrap();

        assert!(name.starts_with(LOG_FILE_PREFIX));
        assert!(name.ends_with("_squat-day-3-4.log"));
        assert_eq!(path.parent(), Some(config.log_path.as_path()));
        assert_eq!(config.session_log_path("  "), config.current_log_path());
    }

    #[test]
    fn test_current_log_path_is_stable() {
        let config = LogConfig::default();
        assert_eq!(config.current_log_path(), config.current_log_path());
        assert!(config.current_log_path().starts_with(&config.log_path));
    }
}
