// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control-socket client used by the `stop`/`status`/`update` CLI
//! subcommands (`spec.md` §6): connect, write one command line, read the
//! one-shot reply.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::protocol;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connecting to opsipxeconfd control socket {path}: {source}")]
    Connect { path: PathBuf, #[source] source: std::io::Error },
    #[error("i/o error talking to opsipxeconfd: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Remote(String),
}

/// Send `command` to the control socket at `socket_path` and return the
/// reply with the `(ERROR)` convention unwrapped — a reply beginning with
/// `(ERROR)` becomes [`ClientError::Remote`] (`spec.md` §4.F, §6).
pub async fn send(socket_path: &Path, command: &str) -> Result<String, ClientError> {
    let mut stream = UnixStream::connect(socket_path)
        .await
        .map_err(|source| ClientError::Connect { path: socket_path.to_path_buf(), source })?;
    stream.write_all(command.as_bytes()).await?;
    stream.shutdown().await?;

    let mut reply = String::new();
    stream.read_to_string(&mut reply).await?;

    if protocol::is_error_reply(&reply) {
        Err(ClientError::Remote(reply.trim_start_matches("(ERROR):").trim().to_string()))
    } else {
        Ok(reply)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
