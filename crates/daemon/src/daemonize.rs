// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon detachment (`spec.md` §6 `-F`/`--no-fork`): re-exec the current
//! binary as a background child with standard streams redirected to
//! `/dev/null`, the same pattern the teacher's CLI uses to launch its
//! daemon (`start_daemon_background`). No raw `fork()` — daemonisation is
//! OS process management, not something the core needs `unsafe` for.

use std::env;
use std::process::{Child, Command, Stdio};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonizeError {
    #[error("could not determine the current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("spawning the background daemon process: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Internal flag appended to the re-exec'd child's arguments so it runs
/// the supervisor directly instead of detaching again.
pub const FOREGROUND_FLAG: &str = "--internal-foreground";

/// Re-exec the current binary with `args` plus [`FOREGROUND_FLAG`],
/// detached from the caller's standard streams. The caller is expected to
/// exit immediately after this returns.
pub fn spawn_background(args: &[String]) -> Result<Child, DaemonizeError> {
    let exe = env::current_exe().map_err(DaemonizeError::CurrentExe)?;
    Command::new(exe)
        .args(args)
        .arg(FOREGROUND_FLAG)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(DaemonizeError::Spawn)
}

#[cfg(test)]
#[path = "daemonize_tests.rs"]
mod tests;
