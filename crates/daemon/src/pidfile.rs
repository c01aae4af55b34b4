// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PID file lifecycle (`spec.md` §4.H, §6): written on `start`, checked
//! for a live matching process before a new `start` proceeds, removed on
//! clean `stop`.

use std::path::{Path, PathBuf};

use nix::sys::signal::kill;
use nix::unistd::Pid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PidFileError {
    #[error("another opsipxeconfd instance is already running (pid {0})")]
    AlreadyRunning(i32),
    #[error("reading pid file {path}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("writing pid file {path}: {source}")]
    Write { path: PathBuf, #[source] source: std::io::Error },
}

/// Check `path` for a stale or live PID, then write the current process's
/// PID to it. Returns [`PidFileError::AlreadyRunning`] if a live process
/// still holds the file — the caller must treat that as fatal (`spec.md`
/// §6 "start refuses to proceed").
pub fn acquire(path: &Path) -> Result<(), PidFileError> {
    if let Some(existing) = read(path)? {
        if is_alive(existing) {
            return Err(PidFileError::AlreadyRunning(existing));
        }
        tracing::info!(pid = existing, path = %path.display(), "removing stale pid file");
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| PidFileError::Write { path: path.to_path_buf(), source })?;
    }
    std::fs::write(path, format!("{}\n", std::process::id()))
        .map_err(|source| PidFileError::Write { path: path.to_path_buf(), source })
}

/// Remove the PID file on clean shutdown (`spec.md` §6). Best-effort: a
/// missing file is not an error.
pub fn release(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), %err, "failed to remove pid file");
        }
    }
}

fn read(path: &Path) -> Result<Option<i32>, PidFileError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents.trim().parse().ok()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(PidFileError::Read { path: path.to_path_buf(), source }),
    }
}

/// Probe whether `pid` names a live process, via `kill(pid, None)` —
/// sends no signal, just checks existence/permission (`spec.md` §4.H).
fn is_alive(pid: i32) -> bool {
    kill(Pid::from_raw(pid), None).is_ok()
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
