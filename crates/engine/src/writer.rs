// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The PXE writer (`spec.md` §4.C): a scoped worker that owns one FIFO,
//! blocks (cooperatively, non-blockingly) until a reader opens it, writes
//! the rendered payload once, and tears itself down.

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::io::Write as _;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const FIFO_MODE: u32 = 0o644;
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("{0} already exists")]
    AlreadyExists(PathBuf),
    #[error("failed to create fifo at {path}: {source}")]
    Mkfifo { path: PathBuf, source: Errno },
}

/// The writer's terminal status, reported to its completion callback
/// exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterOutcome {
    /// The payload was written and the FIFO was unlinked.
    Success,
    /// Cancelled before a reader appeared.
    Cancelled,
    /// A non-"no reader" error on open, or an error on write/unlink.
    Failed(String),
}

/// A handle to a running writer task: lets the owner cancel it and await
/// its termination.
pub struct WriterHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WriterHandle {
    /// Request cancellation; the writer exits its retry loop at the next
    /// tick.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the writer task to finish (success, cancellation, or
    /// failure all converge here — the completion callback has already
    /// run by the time this resolves).
    pub async fn join(self) {
        let _ = self.join.await;
    }
}

/// Create the FIFO at `path` and spawn the retry-open/write/unlink task.
///
/// `path` must not already exist — the caller (the updater, `spec.md`
/// §4.E step 7) is responsible for evicting or unlinking any stale entry
/// first. `payload` must already be fully rendered: construction happens
/// after rendering so template failures surface before the pipe exists
/// for a reader.
pub fn spawn<F>(path: PathBuf, payload: String, on_complete: F) -> Result<WriterHandle, WriterError>
where
    F: FnOnce(WriterOutcome) + Send + 'static,
{
    if path.exists() {
        return Err(WriterError::AlreadyExists(path));
    }
    mkfifo(&path, Mode::from_bits_truncate(FIFO_MODE)).map_err(|source| WriterError::Mkfifo {
        path: path.clone(),
        source,
    })?;

    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let join = tokio::spawn(async move {
        let outcome = run(&path, &payload, &task_cancel).await;
        cleanup(&path);
        on_complete(outcome);
    });

    Ok(WriterHandle { cancel, join })
}

async fn run(path: &Path, payload: &str, cancel: &CancellationToken) -> WriterOutcome {
    loop {
        let attempt_path = path.to_path_buf();
        let opened = match tokio::task::spawn_blocking(move || try_open(&attempt_path)).await {
            Ok(result) => result,
            Err(_) => return WriterOutcome::Failed("open task panicked".to_string()),
        };

        match opened {
            Ok(file) => {
                let payload = payload.to_string();
                return match tokio::task::spawn_blocking(move || write_payload(file, &payload)).await {
                    Ok(Ok(())) => WriterOutcome::Success,
                    Ok(Err(err)) => WriterOutcome::Failed(err.to_string()),
                    Err(_) => WriterOutcome::Failed("write task panicked".to_string()),
                };
            }
            Err(OpenAttempt::NoReader) => {
                tokio::select! {
                    _ = cancel.cancelled() => return WriterOutcome::Cancelled,
                    _ = tokio::time::sleep(RETRY_BACKOFF) => {}
                }
            }
            Err(OpenAttempt::Fatal(message)) => return WriterOutcome::Failed(message),
        }
    }
}

enum OpenAttempt {
    NoReader,
    Fatal(String),
}

/// Attempt one non-blocking open-for-write. Blocking-safe: run inside
/// `spawn_blocking`.
fn try_open(path: &Path) -> Result<std::fs::File, OpenAttempt> {
    match std::fs::OpenOptions::new()
        .write(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(path)
    {
        Ok(file) => Ok(file),
        Err(err) => match err.raw_os_error().map(Errno::from_raw) {
            Some(Errno::ENXIO) => Err(OpenAttempt::NoReader),
            _ => Err(OpenAttempt::Fatal(err.to_string())),
        },
    }
}

/// Write the full payload and close the descriptor. Blocking-safe: run
/// inside `spawn_blocking`.
fn write_payload(mut file: std::fs::File, payload: &str) -> std::io::Result<()> {
    file.write_all(payload.as_bytes())
}

fn cleanup(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(path = %path.display(), %err, "failed to unlink fifo during cleanup"),
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
