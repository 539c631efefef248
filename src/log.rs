//! Tracing setup: console output by default, daily rolling files when
//! `LOG_DIR` is set.

use anyhow::{anyhow, Result};
use std::env;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging() -> Result<()> {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let Ok(log_dir) = env::var("LOG_DIR") else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        return Ok(());
    };

    std::fs::create_dir_all(&log_dir)
        .map_err(|e| anyhow!("Failed to create log directory '{}': {}", log_dir, e))?;
    let log_file_prefix =
        env::var("LOG_FILE_PREFIX").unwrap_or_else(|_| "timelock-vault".to_string());
    let file_appender = rolling::daily(&log_dir, &log_file_prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false),
        )
        .init();

    // The guard must outlive the process or the writer thread stops.
    std::mem::forget(guard);

    info!("Logging to daily rotating files in {}/", log_dir);
    Ok(())
}
