//! Tracing initialization for the CLI.
//!
//! Logs go to stdout and, when possible, to a non-blocking log file. File
//! logging failing is not fatal; the CLI falls back to stdout only.

// -- std imports
use std::{path::PathBuf, sync::OnceLock};

// -- crate imports (conditional)
#[cfg(all(debug_assertions, feature = "tokio-console"))]
use console_subscriber::ConsoleLayer;

// -- crate imports
use anyhow::{Context, Result};
use tracing::warn;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*, registry::Registry};

/// Keeps the non-blocking file writer's worker thread alive for the whole
/// process; dropping it early would lose buffered log records.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_NAME: &str = "game-scout.log";

#[cfg(debug_assertions)]
const LOG_LEVEL: LevelFilter = LevelFilter::DEBUG;

#[cfg(not(debug_assertions))]
const LOG_LEVEL: LevelFilter = LevelFilter::INFO;

/// Path of the log file: next to the binary in debug builds, in the XDG data
/// directory in release builds.
///
/// # Errors
/// - [`anyhow::Error`] if the XDG data directory cannot be used or created.
pub fn log_filepath() -> Result<PathBuf> {
    #[cfg(debug_assertions)]
    {
        let path = PathBuf::from(LOG_FILE_NAME);
        let _ = std::fs::remove_file(&path);
        Ok(path)
    }

    #[cfg(not(debug_assertions))]
    {
        xdg::BaseDirectories::with_prefix("game-scout")
            .place_data_file(LOG_FILE_NAME)
            .with_context(|| "Could not determine log file path")
    }
}

fn build_file_writer() -> Result<NonBlocking> {
    let path = log_filepath()?;
    let dir = path.parent().context("Could not determine log file directory")?;
    let file_name = path.file_name().context("Could not determine log file name")?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);

    Ok(writer)
}

/// Install the global tracing subscriber (stdout + file, env-filterable).
///
/// # Errors
/// - [`anyhow::Error`] if the global subscriber cannot be installed.
pub fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LOG_LEVEL.into())
        .from_env_lossy();

    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_file(cfg!(debug_assertions))
        .with_line_number(cfg!(debug_assertions))
        .with_filter(env_filter.clone());

    match build_file_writer() {
        Ok(writer) => {
            let file_layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer)
                .with_filter(env_filter);

            #[cfg(all(debug_assertions, feature = "tokio-console"))]
            let subscriber = Registry::default()
                .with(stdout_layer)
                .with(file_layer)
                .with(ConsoleLayer::builder().spawn());

            #[cfg(not(all(debug_assertions, feature = "tokio-console")))]
            let subscriber = Registry::default().with(stdout_layer).with(file_layer);

            tracing::subscriber::set_global_default(subscriber)?;
        }
        Err(e) => {
            let subscriber = Registry::default().with(stdout_layer);
            tracing::subscriber::set_global_default(subscriber)?;
            warn!("File logging could not be initialized, stdout only: {e}");
        }
    }

    Ok(())
}
