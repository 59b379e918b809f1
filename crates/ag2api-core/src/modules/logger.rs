//! Logging setup.
//!
//! Console output (stderr) always; a daily-rolling file next to it when a log
//! directory is configured.

use std::path::Path;
use std::time::{Duration, SystemTime};

use ag2api_types::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{AppError, AppResult};

/// File name prefix of rolled log files (`ag2api.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "ag2api.log";

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. The returned guard flushes the
/// file writer on drop and must be held for the life of the process.
pub fn init_logger(config: &LogConfig) -> AppResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AppError::Logger(format!("invalid log filter '{}': {}", config.level, e)))?;

    let console = fmt::layer()
        .with_target(false)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match &config.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_timer(UtcTime::rfc_3339())
                .with_writer(writer);
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Logger(e.to_string()))?;

    if let Some(dir) = &config.dir {
        match cleanup_old_logs(dir, config.retention_days) {
            Ok(0) => {},
            Ok(removed) => tracing::info!("[Logger] Removed {} expired log file(s)", removed),
            Err(e) => tracing::warn!("[Logger] Log cleanup failed: {}", e),
        }
    }

    Ok(guard)
}

/// Delete rolled log files older than `retention_days`. 0 keeps everything.
///
/// Returns the number of files removed.
pub fn cleanup_old_logs(dir: &Path, retention_days: u32) -> AppResult<usize> {
    if retention_days == 0 || !dir.exists() {
        return Ok(0);
    }

    let max_age = Duration::from_secs(u64::from(retention_days) * SECS_PER_DAY);
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_name().to_string_lossy().starts_with(LOG_FILE_PREFIX) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let expired = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > max_age);
        if expired {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    Ok(removed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str, age_days: u64) {
        let file = std::fs::File::create(dir.join(name)).unwrap();
        let modified = SystemTime::now() - Duration::from_secs(age_days * SECS_PER_DAY);
        file.set_modified(modified).unwrap();
    }

    #[test]
    fn test_cleanup_removes_only_expired_log_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "ag2api.log.2020-01-01", 10);
        touch(dir.path(), "ag2api.log.2020-01-09", 1);
        touch(dir.path(), "raw_response_old.json", 10);

        assert_eq!(cleanup_old_logs(dir.path(), 3).unwrap(), 1);
        assert!(!dir.path().join("ag2api.log.2020-01-01").exists());
        assert!(dir.path().join("ag2api.log.2020-01-09").exists());
        assert!(dir.path().join("raw_response_old.json").exists());
    }

    #[test]
    fn test_zero_retention_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "ag2api.log.2020-01-01", 400);
        assert_eq!(cleanup_old_logs(dir.path(), 0).unwrap(), 0);
        assert!(dir.path().join("ag2api.log.2020-01-01").exists());
    }

    #[test]
    fn test_missing_dir_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cleanup_old_logs(&dir.path().join("nope"), 3).unwrap(), 0);
    }
}
