//! Logging configuration using tracing

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/pipdeck/logs/` so that they never
/// interleave with streamed command output on the terminal.
/// Log level is controlled by `PIPDECK_LOG` environment variable.
///
/// # Examples
/// ```bash
/// PIPDECK_LOG=debug pipdeck install requests
/// PIPDECK_LOG=trace pipdeck run -- ls -la
/// ```
pub fn init() -> Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "pipdeck.log");

    // Default to info, allow override via PIPDECK_LOG
    let env_filter = EnvFilter::try_from_env("PIPDECK_LOG")
        .unwrap_or_else(|_| EnvFilter::new("pipdeck=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .init();

    tracing::info!("pipdeck starting, log directory: {}", log_dir.display());

    Ok(())
}

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("pipdeck").join("logs"))
}
