// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured logging setup (`spec.md` §4.H, §6): a non-blocking file
//! writer plus an `EnvFilter` derived from the `log level` config key,
//! reconfigurable in place on `reload` via a `tracing_subscriber::reload`
//! layer, since the global subscriber can only be installed once per
//! process.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

type DynLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("creating log directory for {path}: {source}")]
    CreateDir { path: PathBuf, #[source] source: std::io::Error },
    #[error("installing reloaded logging layer: {0}")]
    Reload(#[from] reload::Error),
}

/// Installed once at process startup. [`LoggingHandle::reload`] swaps the
/// writer/filter pair in place rather than re-initialising the global
/// subscriber.
pub struct LoggingHandle {
    #[allow(dead_code)]
    guard: tracing_appender::non_blocking::WorkerGuard,
    handle: reload::Handle<DynLayer, Registry>,
}

impl LoggingHandle {
    /// Install the global subscriber. Must be called exactly once per
    /// process.
    pub fn init(log_file: &Path, log_level: u8) -> Result<Self, LoggingError> {
        let (layer, guard) = build_layer(log_file, log_level)?;
        let (reloadable, handle) = reload::Layer::new(layer);
        // Only the first call in a process actually installs the global
        // subscriber; later calls (e.g. one per integration test sharing a
        // test binary) are harmless no-ops rather than a panic.
        let _ = tracing_subscriber::registry().with(reloadable).try_init();
        Ok(Self { guard, handle })
    }

    /// Rebuild the writer/filter from the given config values and swap
    /// them in (`spec.md` §6: "changes take effect on SIGHUP except `pid
    /// file`, which requires restart" — `log_file`/`log_level` included).
    pub fn reload(&mut self, log_file: &Path, log_level: u8) -> Result<(), LoggingError> {
        let (layer, guard) = build_layer(log_file, log_level)?;
        self.handle.reload(layer)?;
        self.guard = guard;
        Ok(())
    }
}

fn build_layer(log_file: &Path, log_level: u8) -> Result<(DynLayer, tracing_appender::non_blocking::WorkerGuard), LoggingError> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent).map_err(|source| LoggingError::CreateDir { path: log_file.to_path_buf(), source })?;
    }
    let file_name = log_file.file_name().unwrap_or_else(|| OsStr::new("opsipxeconfd.log"));
    let dir = log_file.parent().unwrap_or_else(|| Path::new("."));
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_directive(log_level)));
    let layer = fmt::layer().with_writer(writer).with_ansi(false).with_filter(filter);
    Ok((Box::new(layer), guard))
}

/// Map `spec.md` §6's `0..9` `log level` scale onto `tracing` directives,
/// the way the historical opsi daemons grade verbosity (0 silent, 9 most
/// verbose).
fn level_directive(log_level: u8) -> &'static str {
    match log_level {
        0 => "off",
        1..=2 => "error",
        3..=4 => "warn",
        5..=6 => "info",
        7..=8 => "debug",
        _ => "trace",
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
