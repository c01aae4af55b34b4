// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control-channel wire format (`spec.md` §4.F, §6): one UTF-8
//! command line per connection, up to 4 KiB, read within a 1s timeout;
//! one UTF-8 reply, success or `(ERROR): <message>`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_REQUEST_BYTES: usize = 4096;
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);
pub const STOP_REPLY: &str = "opsipxeconfd is going down";

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("request is not valid UTF-8")]
    NotUtf8,
    #[error("timed out waiting for a request")]
    Timeout,
    #[error("connection closed before a request was received")]
    ConnectionClosed,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// One parsed control command (`spec.md` §4.F).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stop,
    Status,
    Update { host_id: String, cache_path: Option<PathBuf> },
}

/// Read one request: at most [`MAX_REQUEST_BYTES`], within
/// [`READ_TIMEOUT`], treated as a single line (trailing `\n`/`\r` trimmed).
pub async fn read_request<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, ProtocolError> {
    let mut buf = vec![0u8; MAX_REQUEST_BYTES];
    let n = tokio::time::timeout(READ_TIMEOUT, reader.read(&mut buf))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    if n == 0 {
        return Err(ProtocolError::ConnectionClosed);
    }
    let text = std::str::from_utf8(&buf[..n]).map_err(|_| ProtocolError::NotUtf8)?;
    Ok(text.trim_end_matches(['\n', '\r']).to_string())
}

/// Write `response` and close the write half — connections are one-shot
/// (`spec.md` §4.F).
pub async fn write_response<W: AsyncWrite + Unpin>(writer: &mut W, response: &str) -> Result<(), ProtocolError> {
    writer.write_all(response.as_bytes()).await?;
    writer.shutdown().await?;
    Ok(())
}

/// Parse one command line into a [`Command`], or an error message
/// suitable for wrapping in `(ERROR): ...` (`spec.md` §4.F, §7 kind 7).
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("stop") => Ok(Command::Stop),
        Some("status") => Ok(Command::Status),
        Some("update") => {
            let host_id = parts.next().ok_or("update requires a hostId argument")?.to_string();
            let cache_path = parts.next().map(PathBuf::from);
            if parts.next().is_some() {
                return Err("update takes at most two arguments".to_string());
            }
            Ok(Command::Update { host_id, cache_path })
        }
        Some(other) => Err(format!("unknown command {other:?}")),
        None => Err("empty command".to_string()),
    }
}

/// Format an error reply. Per `spec.md` §4.F, any reply beginning with
/// `(ERROR)` is a failure; everything else is a success.
pub fn format_error(reason: impl std::fmt::Display) -> String {
    format!("(ERROR): {reason}")
}

pub fn is_error_reply(reply: &str) -> bool {
    reply.starts_with("(ERROR)")
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
