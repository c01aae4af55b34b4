//! Shared helpers for the end-to-end behavioral specifications.
//!
//! These specs drive the real [`Supervisor`], control listener, and PXE
//! writers end to end, against a [`FakeBackend`] rather than a live opsi
//! service — see `DESIGN.md` for why a black-box CLI harness like the
//! one this workspace's layout is modelled on isn't feasible here.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pxe_backend::FakeBackend;
use pxe_core::{FakeClock, HostId, HostRecord, NetbootProduct, ProductId, ProductOnClient};
use pxe_daemon::Supervisor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

pub const MAX_WAIT_MS: u64 = 5000;
const POLL_MS: u64 = 10;

/// A running daemon under test: a real supervisor, bound to a real
/// control socket and a real pxe-config directory under a temp dir, with
/// a `FakeBackend` standing in for opsiconfd.
pub struct Daemon {
    dir: tempfile::TempDir,
    backend: FakeBackend,
    supervisor: Arc<Supervisor<FakeBackend, FakeClock>>,
    task: tokio::task::JoinHandle<()>,
}

impl Daemon {
    /// Start a daemon with the standard test config plus whatever extra
    /// `key = value` lines the scenario needs.
    pub async fn start(extra_config: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        write_config(dir.path(), extra_config);
        let backend = FakeBackend::new();
        let b = backend.clone();
        let conffile = dir.path().join("opsipxeconfd.conf");
        let supervisor = Arc::new(Supervisor::new(conffile, FakeClock::new(1_000_000), move |_cfg| Ok(b.clone())));

        let running = Arc::clone(&supervisor);
        let task = tokio::spawn(async move {
            running.start(None).await.expect("supervisor should start");
        });

        let daemon = Self { dir, backend, supervisor, task };
        daemon.wait_for_socket().await;
        daemon
    }

    async fn wait_for_socket(&self) {
        for _ in 0..(MAX_WAIT_MS / POLL_MS) {
            if self.socket().exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(POLL_MS)).await;
        }
        panic!("control socket never appeared at {}", self.socket().display());
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn pxe_dir(&self) -> PathBuf {
        self.dir.path().join("pxelinux.cfg")
    }

    pub fn socket(&self) -> PathBuf {
        self.dir.path().join("opsipxeconfd.socket")
    }

    pub fn backend(&self) -> &FakeBackend {
        &self.backend
    }

    /// Send one control command and return the raw reply.
    pub async fn send(&self, command: &str) -> String {
        let mut stream = UnixStream::connect(self.socket()).await.expect("connect to control socket");
        stream.write_all(command.as_bytes()).await.expect("write command");
        stream.shutdown().await.expect("shutdown write half");
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.expect("read reply");
        reply
    }

    /// Request shutdown via `stop` (mirrors the CLI's `stop` subcommand)
    /// and wait for the supervisor task to finish.
    pub async fn stop_via_control(mut self) -> String {
        let reply = self.send("stop").await;
        self.finish().await;
        reply
    }

    /// Request shutdown directly through the shutdown handle, as
    /// `SIGTERM`/`SIGINT` would, and wait for the supervisor to finish.
    pub async fn stop(mut self) {
        self.supervisor.shutdown_handle().notify_one();
        self.finish().await;
    }

    async fn finish(&mut self) {
        let task = &mut self.task;
        tokio::time::timeout(Duration::from_millis(MAX_WAIT_MS), task)
            .await
            .expect("supervisor should shut down promptly")
            .expect("supervisor task should not panic");
    }
}

fn write_config(dir: &Path, extra: &str) {
    std::fs::create_dir_all(dir.join("pxelinux.cfg")).expect("create pxe config dir");
    std::fs::write(dir.join("pxelinux.cfg").join("install"), "append initrd=opsi root=/dev/ram0\n").expect("write default template");
    std::fs::write(dir.join("pxelinux.cfg").join("altinstall"), "append initrd=opsi root=/dev/ram0 alt=1\n").expect("write alt template");

    let conffile = dir.join("opsipxeconfd.conf");
    std::fs::write(
        &conffile,
        format!(
            "pid file = {}\n\
             log file = {}\n\
             control socket = {}\n\
             pxe config dir = {}\n\
             pxe config template = {}\n\
             depot id = depot1.example.org\n\
             max pxe config writers = 10\n\
             {extra}\n",
            dir.join("opsipxeconfd.pid").display(),
            dir.join("opsipxeconfd.log").display(),
            dir.join("opsipxeconfd.socket").display(),
            dir.join("pxelinux.cfg").display(),
            dir.join("pxelinux.cfg").join("install").display(),
        ),
    )
    .expect("write config file");
}

/// Read a FIFO to completion on a blocking thread (FIFOs require a real
/// blocking open on the read side) and assert it then disappears.
pub async fn read_fifo_once(path: PathBuf) -> String {
    wait_for(MAX_WAIT_MS, || path.exists()).await;
    let read_path = path.clone();
    let content = tokio::task::spawn_blocking(move || std::fs::read_to_string(&read_path).expect("read fifo"))
        .await
        .expect("read task should not panic");
    wait_for(MAX_WAIT_MS, || !path.exists()).await;
    content
}

pub async fn wait_for(timeout_ms: u64, mut condition: impl FnMut() -> bool) {
    for _ in 0..(timeout_ms / POLL_MS) {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(POLL_MS)).await;
    }
    panic!("condition did not become true within {timeout_ms}ms");
}

/// Seed a single host with one outstanding netboot action, ready for
/// `update <host_id>` to pick up.
pub fn seed_basic_host(
    backend: &FakeBackend,
    host_id: &str,
    mac: &str,
    host_key: &str,
    product_id: &str,
    action: pxe_core::BootAction,
    service_url: &str,
) -> HostId {
    let host = HostId::new(host_id);
    backend.seed_host(
        host.clone(),
        HostRecord { mac: Some(mac.to_string()), ipv4: None, host_key: Some(pxe_core::Confidential::new(host_key.to_string())) },
    );
    let product = ProductId::new(product_id);
    backend.seed_netboot_actions(host.clone(), vec![ProductOnClient::new(host.clone(), product.clone(), action)]);
    backend.seed_products_on_depot(
        "depot1.example.org",
        vec![pxe_core::ProductOnDepot { product_id: product.clone(), product_version: "1.0".to_string(), package_version: "1".to_string() }],
    );
    backend.seed_netboot_product(product, "1.0", "1", NetbootProduct::default());
    backend.seed_config_state(host.clone(), "clientconfig.configserver.url", vec![service_url.to_string()]);
    host
}
