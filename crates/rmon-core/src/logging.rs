//! File logging for the `rmon` binary
//!
//! stdout carries NDJSON events, so diagnostics go to a daily rolling file
//! under the platform data dir (`rmon.log.YYYY-MM-DD`).

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Environment variable holding the tracing filter directive
pub const LOG_ENV_VAR: &str = "RMON_LOG";

const DEFAULT_FILTER: &str = "result_monitor=info,rmon_app=info,rmon_core=info,warn";

const LOG_FILE_PREFIX: &str = "rmon.log";

/// Install the global subscriber.
///
/// The filter comes from `RMON_LOG` (e.g. `RMON_LOG=rmon_app=trace`),
/// falling back to info for the monitor's own crates.
pub fn init() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)?;

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(RollingFileAppender::new(
                    Rotation::DAILY,
                    &log_dir,
                    LOG_FILE_PREFIX,
                ))
                .with_ansi(false)
                // Handler calls must stay on the owner thread; ids make that visible
                .with_thread_ids(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .try_init()
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;

    tracing::info!("Logging to {}", log_dir.display());
    Ok(())
}

/// Directory the daily log files are written to
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("result-monitor")
        .join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_is_app_scoped() {
        assert!(log_directory().ends_with("result-monitor/logs"));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
