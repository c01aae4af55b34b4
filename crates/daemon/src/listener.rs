// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control server (`spec.md` §4.F): accepts bounded concurrent
//! connections on a filesystem stream socket, reads one command per
//! connection, and dispatches to `stop`/`status`/`update`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pxe_backend::Backend;
use pxe_core::Clock;
use pxe_engine::{Updater, WriterRegistry};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Notify, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::protocol::{self, Command};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Tracks currently open control connections for `status` reporting
/// (`spec.md` §4.F "number of open control connections with their start
/// times").
#[derive(Clone)]
pub struct ConnectionSet<C: Clock> {
    state: Arc<Mutex<HashMap<u64, i64>>>,
    next_id: Arc<AtomicU64>,
    clock: C,
}

impl<C: Clock> ConnectionSet<C> {
    pub fn new(clock: C) -> Self {
        Self { state: Arc::new(Mutex::new(HashMap::new())), next_id: Arc::new(AtomicU64::new(0)), clock }
    }

    fn insert(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.state.lock().insert(id, self.clock.now());
        id
    }

    fn remove(&self, id: u64) {
        self.state.lock().remove(&id);
    }

    /// Start timestamps of every open connection, for `status`.
    pub fn list_all(&self) -> Vec<i64> {
        self.state.lock().values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().len()
    }
}

/// Shared state every control connection handler needs.
pub struct ListenCtx<B: Backend, C: Clock> {
    pub updater: Updater<B, C>,
    pub registry: WriterRegistry<C>,
    pub connections: ConnectionSet<C>,
    pub shutdown: Arc<Notify>,
    pub max_connections: usize,
}

/// The control-socket accept loop.
pub struct Listener<B: Backend, C: Clock> {
    socket: UnixListener,
    ctx: Arc<ListenCtx<B, C>>,
}

impl<B, C> Listener<B, C>
where
    B: Backend,
    C: Clock,
{
    pub fn new(socket: UnixListener, ctx: Arc<ListenCtx<B, C>>) -> Self {
        Self { socket, ctx }
    }

    /// Accept connections until `cancel` fires. Concurrency is capped at
    /// `max_connections`: once at capacity, the loop does not call
    /// `accept` again until a slot frees, so excess clients genuinely
    /// queue in the kernel's listen backlog (`spec.md` §5).
    pub async fn run(self, cancel: CancellationToken) {
        let semaphore = Arc::new(Semaphore::new(self.ctx.max_connections));
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let permit = match tokio::time::timeout(ACCEPT_POLL_INTERVAL, semaphore.clone().acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_)) => break,
                Err(_) => continue,
            };
            match tokio::time::timeout(ACCEPT_POLL_INTERVAL, self.socket.accept()).await {
                Ok(Ok((stream, _addr))) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        let _permit = permit;
                        handle_connection(stream, ctx).await;
                    });
                }
                Ok(Err(err)) => tracing::error!(%err, "control socket accept error"),
                Err(_) => {}
            }
        }
    }
}

async fn handle_connection<B: Backend, C: Clock>(stream: UnixStream, ctx: Arc<ListenCtx<B, C>>) {
    let id = ctx.connections.insert();
    let (mut reader, mut writer) = stream.into_split();
    let result = serve_one(&mut reader, &mut writer, &ctx).await;
    ctx.connections.remove(id);
    match result {
        Ok(()) => {}
        Err(protocol::ProtocolError::ConnectionClosed) => tracing::debug!("control client disconnected without sending a request"),
        Err(err) => tracing::warn!(%err, "control connection error"),
    }
}

async fn serve_one<B: Backend, C: Clock>(
    reader: &mut (impl tokio::io::AsyncRead + Unpin),
    writer: &mut (impl tokio::io::AsyncWrite + Unpin),
    ctx: &ListenCtx<B, C>,
) -> Result<(), protocol::ProtocolError> {
    let line = protocol::read_request(reader).await?;
    tracing::info!(request = %line, "control request received");
    let reply = dispatch(&line, ctx).await;
    protocol::write_response(writer, &reply).await
}

async fn dispatch<B: Backend, C: Clock>(line: &str, ctx: &ListenCtx<B, C>) -> String {
    match protocol::parse_command(line) {
        Err(reason) => protocol::format_error(reason),
        Ok(Command::Stop) => {
            ctx.shutdown.notify_one();
            protocol::STOP_REPLY.to_string()
        }
        Ok(Command::Status) => status_report(ctx),
        Ok(Command::Update { host_id, cache_path }) => match ctx.updater.update(&host_id, cache_path).await {
            Ok(message) => message,
            Err(err) => protocol::format_error(err),
        },
    }
}

fn status_report<B: Backend, C: Clock>(ctx: &ListenCtx<B, C>) -> String {
    let mut out = String::new();
    let connections = ctx.connections.list_all();
    out.push_str(&format!("{} open control connection(s)\n", connections.len()));
    for started_at in &connections {
        out.push_str(&format!("  connection open since {started_at}\n"));
    }

    let writers = ctx.registry.list_all();
    out.push_str(&format!("{} active boot config writer(s)\n", writers.len()));
    for writer in &writers {
        out.push_str(&format!(
            "  Boot config for client {} (pxefile={}, append={}, since {})\n",
            writer.host_id,
            writer.pxefile.display(),
            redacted_append_tokens(&writer.append),
            writer.started_at,
        ));
    }
    out
}

/// Render append tokens for `status`, masking `pckey` (`spec.md` §9
/// "Confidential fields").
fn redacted_append_tokens(append: &pxe_core::AppendBag) -> String {
    append
        .iter()
        .map(|(k, v)| {
            if k == "pckey" {
                "pckey=***".to_string()
            } else if v.is_empty() {
                k.to_string()
            } else {
                format!("{k}={v}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Bind the control socket at `path`, unlinking a stale entry first, and
/// widen the mode to world read+write (`spec.md` §4.F).
pub fn bind(path: &PathBuf) -> std::io::Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let listener = UnixListener::bind(path)?;
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o666))?;
    Ok(listener)
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
