//! Logging setup.
//!
//! Console output goes to stderr so stdout stays free for emitted properties.
//! Optional JSON file logging is controlled by environment variables:
//!
//! - `DESCRIBE_FILE_LOGGING`: "true" or "1" to enable
//! - `DESCRIBE_LOG_DIR`: log directory (defaults to the platform data dir)
//! - `DESCRIBE_LOG_MAX_FILES`: daily files to retain (default: 7)

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "git-describe.log";

#[derive(Debug, Clone)]
pub struct FileLoggingConfig {
    pub enabled: bool,
    pub log_dir: PathBuf,
    pub max_files: usize,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        let enabled = std::env::var("DESCRIBE_FILE_LOGGING")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let log_dir = std::env::var("DESCRIBE_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_log_dir());

        let max_files = std::env::var("DESCRIBE_LOG_MAX_FILES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(7);

        Self {
            enabled,
            log_dir,
            max_files,
        }
    }
}

fn default_log_dir() -> PathBuf {
    ProjectDirs::from("", "", "git-describe")
        .map(|dirs| dirs.data_local_dir().join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("git-describe").join("logs"))
}

fn filter(log_level: &str) -> EnvFilter {
    let directives = format!("warn,git_describe={level},describe={level}", level = log_level);
    EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("Invalid log level {:?} ({}), using info", log_level, e);
        EnvFilter::new("warn,git_describe=info,describe=info")
    })
}

/// Install the global subscriber. Hold the returned guard until exit so
/// buffered file logs are flushed.
pub fn init_logging(log_level: &str) -> Option<WorkerGuard> {
    let config = FileLoggingConfig::default();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter(log_level));

    if !config.enabled {
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("Failed to create log directory {:?}: {}", config.log_dir, e);
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(filter(log_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::debug!(log_dir = ?config.log_dir, "File logging enabled");
    cleanup_old_logs(&config.log_dir, config.max_files);

    Some(guard)
}

/// Keep only the `max_files` most recently modified log files.
fn cleanup_old_logs(log_dir: &Path, max_files: usize) {
    let Ok(entries) = std::fs::read_dir(log_dir) else {
        return;
    };

    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
        })
        .filter_map(|e| {
            e.metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(|t| (e.path(), t))
        })
        .collect();

    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.into_iter().skip(max_files) {
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!("Failed to remove old log file {:?}: {}", path, e);
        }
    }
}
