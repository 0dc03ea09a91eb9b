//! Logging setup.
//!
//! Events go to the console and to a plain-text file named after the start
//! time of the process, `sync_<YYYY-MM-DD_HH-MM-SS>.log`.

use crate::error::{CliError, CliResult};
use macon_sync_engine::backup_timestamp;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `verbose`. The returned guard flushes
/// the file writer when dropped and must be held until exit.
pub fn init(log_dir: &Path, verbose: bool) -> CliResult<WorkerGuard> {
    let appender = open_log_file(log_dir, &backup_timestamp())?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let console_layer = fmt::layer().with_target(false);
    let file_layer = fmt::layer().with_writer(writer).with_ansi(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))?;
    Ok(guard)
}

/// Opens `sync_<stamp>.log` inside `log_dir`, creating the directory.
pub fn open_log_file(log_dir: &Path, stamp: &str) -> CliResult<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(format!("sync_{stamp}"))
        .filename_suffix("log")
        .build(log_dir)
        .map_err(|e| CliError::Logging(format!("{}: {e}", log_dir.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_is_named_after_start_time() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");

        let _appender = open_log_file(&log_dir, "2024-05-01_08-30-00").unwrap();
        assert!(log_dir.join("sync_2024-05-01_08-30-00.log").exists());
    }
}
