//! Tracing setup for the worker.
//!
//! Human-readable logs go to stdout. The same events are also appended
//! as JSON lines to a per-run file, `{log_dir}/process_{YYYYMMDD_HHMMSS}.log`.
//! `RUST_LOG` overrides [`DEFAULT_FILTER`].

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use quill_core::naming;
use quill_core::types::Timestamp;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str =
    "quill_worker=info,quill_pipeline=info,quill_imagegen=info,quill_llm=info";

/// Install the global subscriber and return the run log path.
pub fn init(log_dir: &Path, started: Timestamp) -> anyhow::Result<PathBuf> {
    let (file, path) = open_run_log(log_dir, started)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(path)
}

/// Create `log_dir` if needed and open the run log for appending.
pub fn open_run_log(log_dir: &Path, started: Timestamp) -> anyhow::Result<(File, PathBuf)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let path = log_dir.join(naming::log_filename(started));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open run log {}", path.display()))?;
    Ok((file, path))
}
