//! Structured logging setup
//!
//! Opt-in initializer for embedders that do not install their own tracing
//! subscriber: a compact console layer on stderr plus a JSON file layer
//! with daily rotation under the platform config directory.
//!
//! Set `RUST_LOG` to control verbosity (`info` by default, e.g.
//! `RUST_LOG=netmon_core=debug`).

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const APP_DIR: &str = "netmon";

/// Initialize logging; returns the log directory in use.
pub fn init_logging() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let log_dir = log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "netmon.log");

    let console_layer = fmt::layer().with_target(false).compact();

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .json();

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let init_result = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Err(e) = init_result {
        // The embedder (or a test) may already have installed a subscriber.
        if e.to_string().contains("already been set") {
            return Ok(log_dir);
        }
        return Err(Box::new(e));
    }

    tracing::info!("logging initialized, log directory: {}", log_dir.display());
    Ok(log_dir)
}

fn log_directory() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = if cfg!(target_os = "windows") {
        dirs::data_local_dir().ok_or("could not find APPDATA directory")?
    } else {
        dirs::config_dir().ok_or("could not find config directory")?
    };

    Ok(base_dir.join(APP_DIR).join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_under_app_dir() {
        let log_dir = log_directory().expect("should resolve log directory");
        assert!(log_dir.to_string_lossy().contains(APP_DIR));
        assert!(log_dir.ends_with("logs") || log_dir.to_string_lossy().contains("logs"));
    }
}
