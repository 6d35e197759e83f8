//! Tracing setup: human-readable stderr plus a plain-text log file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};
use kairon_runtime::config::LoggingSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Filter directive for the configured level and `-v` count.
///
/// `-v` raises the level to debug, `-vv` and beyond to trace.
pub fn filter_directive(level: &str, verbose: u8) -> String {
    match verbose {
        0 => level.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Timestamped log file name for a run started at `now`.
pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("kairon_{}.log", now.format("%Y%m%d_%H%M%S"))
}

/// Where this run writes its log file.
pub fn resolve_log_path(file: Option<&Path>, now: DateTime<Local>) -> PathBuf {
    match file {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(log_file_name(now)),
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must live until
/// the process exits.
pub fn init(settings: &LoggingSettings, verbose: u8) -> anyhow::Result<WorkerGuard> {
    let directive = filter_directive(&settings.level, verbose);
    let stderr_filter =
        EnvFilter::try_new(&directive).with_context(|| format!("Invalid log level '{}'", directive))?;
    let file_filter = EnvFilter::try_new(&directive)?;

    let path = resolve_log_path(settings.file.as_deref(), Local::now());
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("Log path '{}' has no file name", path.display()))?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory '{}'", dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
    }

    #[test]
    fn test_verbosity_overrides_level() {
        assert_eq!(filter_directive("warn", 0), "warn");
        assert_eq!(filter_directive("warn", 1), "debug");
        assert_eq!(filter_directive("warn", 4), "trace");
    }

    #[test]
    fn test_timestamped_file_name() {
        assert_eq!(log_file_name(fixed_time()), "kairon_20240309_140507.log");
    }

    #[test]
    fn test_explicit_file_wins() {
        let path = resolve_log_path(Some(Path::new("logs/run.log")), fixed_time());
        assert_eq!(path, PathBuf::from("logs/run.log"));

        let path = resolve_log_path(None, fixed_time());
        assert_eq!(path, PathBuf::from("kairon_20240309_140507.log"));
    }
}
