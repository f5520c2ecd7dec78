//! Global tracing setup: human-readable stderr output plus a per-run log file.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "passforge=info,passforge_av=info";
const VERBOSE_FILTER: &str = "passforge=debug,passforge_av=debug,reqwest=info";

/// Log file name for a run started at `started`.
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("transcode_{}.log", started.format("%Y-%m-%d-%H_%M_%S"))
}

/// Filter directives, honouring `RUST_LOG` when set.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        })
    })
}

/// Install the global subscriber.
///
/// Returns the log file path and the guard that flushes it; keep the guard
/// alive until the process exits.
pub fn init(log_dir: &Path, verbose: bool) -> Result<(PathBuf, WorkerGuard)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log dir: {:?}", log_dir))?;

    let file_name = log_file_name(Local::now());
    let appender = tracing_appender::rolling::never(log_dir, &file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok((log_dir.join(file_name), guard))
}
