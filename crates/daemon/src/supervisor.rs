// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The supervisor (`spec.md` §4.H): owns every other component's
//! lifecycle and exposes `start`/`reload`/`stop`.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use pxe_backend::Backend;
use pxe_core::Clock;
use pxe_engine::{Reconciler, Updater, UpdaterConfig, WriterRegistry};
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ConfigError};
use crate::listener::{self, ConnectionSet, ListenCtx, Listener};
use crate::logging::{LoggingError, LoggingHandle};
use crate::pidfile::{self, PidFileError};

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    PidFile(#[from] PidFileError),
    #[error(transparent)]
    Logging(#[from] LoggingError),
    #[error("constructing backend: {0}")]
    Backend(String),
    #[error("binding control socket {path}: {source}")]
    Bind { path: PathBuf, #[source] source: std::io::Error },
}

struct RunningListener {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Builds a fresh backend instance from a just-(re)loaded [`Config`].
/// A closure rather than a fixed concrete type so tests can hand in a
/// [`pxe_backend::FakeBackend`] while the real binary hands in one that
/// constructs `OpsiRpcBackend`.
pub type BackendFactory<B> = Arc<dyn Fn(&Config) -> Result<B, SupervisorError> + Send + Sync>;

/// Owns the lifecycle of every other component (`spec.md` §4.H).
///
/// `start`/`reload`/`stop` take `self: &Arc<Self>` because the signal
/// handling task (`spec.md` §5 "Signals") needs to call back into the
/// supervisor from a task it does not otherwise share ownership with.
pub struct Supervisor<B: Backend, C: Clock> {
    conffile: PathBuf,
    clock: C,
    backend_factory: BackendFactory<B>,
    config: Mutex<Config>,
    registry: WriterRegistry<C>,
    connections: ConnectionSet<C>,
    shutdown: Arc<Notify>,
    listener: Mutex<Option<RunningListener>>,
    reconcile_cancel: Mutex<Option<CancellationToken>>,
    logging: Mutex<Option<LoggingHandle>>,
}

impl<B, C> Supervisor<B, C>
where
    B: Backend,
    C: Clock,
{
    pub fn new(
        conffile: PathBuf,
        clock: C,
        backend_factory: impl Fn(&Config) -> Result<B, SupervisorError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            conffile,
            registry: WriterRegistry::new(clock.clone()),
            connections: ConnectionSet::new(clock.clone()),
            clock,
            backend_factory: Arc::new(backend_factory),
            config: Mutex::new(Config::default()),
            shutdown: Arc::new(Notify::new()),
            listener: Mutex::new(None),
            reconcile_cancel: Mutex::new(None),
            logging: Mutex::new(None),
        }
    }

    /// The `Notify` the control server's `stop` command fires; awaited by
    /// [`Supervisor::start`] and by tests that want to trigger a shutdown
    /// without going through a real control connection.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// The clock backing the writer registry and connection set, exposed
    /// for tests that drive a [`pxe_core::FakeClock`].
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// The shared writer registry, exposed for tests that want to assert
    /// on active writers without going through the control socket.
    pub fn registry(&self) -> &WriterRegistry<C> {
        &self.registry
    }

    /// The control socket path currently in effect, once `start`/`reload`
    /// has run at least once.
    pub fn control_socket(&self) -> PathBuf {
        self.config.lock().control_socket.clone()
    }

    /// `init -> running`: wire signal handlers, build the backend, launch
    /// startup reconciliation, bind the control socket, and block until a
    /// `stop` (control command or `SIGTERM`/`SIGINT`) is observed.
    ///
    /// Any failure here is fatal (`spec.md` §4.H); the caller should exit
    /// non-zero.
    pub async fn start(self: &Arc<Self>, log_level_override: Option<u8>) -> Result<(), SupervisorError> {
        let mut config = Config::load(&self.conffile)?;
        if let Some(level) = log_level_override {
            config.log_level = level;
        }
        pidfile::acquire(&config.pid_file)?;

        let logging = LoggingHandle::init(&config.log_file, config.log_level)?;
        *self.logging.lock() = Some(logging);

        let backend = (self.backend_factory)(&config)?;
        backend
            .set_backend_options(true, true)
            .await
            .map_err(|err| SupervisorError::Backend(err.to_string()))?;
        let updater = self.build_updater(&config, backend.clone());

        let reconcile_cancel = CancellationToken::new();
        *self.reconcile_cancel.lock() = Some(reconcile_cancel.clone());
        let reconciler = Reconciler::new(backend, updater.clone(), config.depot_id.clone());
        tokio::spawn(async move {
            reconciler.run(&reconcile_cancel).await;
        });

        self.rebind_listener(&config, updater)?;
        *self.config.lock() = config;

        self.wire_signals();

        tracing::info!("opsipxeconfd ready");
        self.shutdown.notified().await;
        self.stop().await;
        Ok(())
    }

    /// `running -> running`: re-read the config file, reconfigure
    /// logging, rebuild the backend/updater, and rebind the control
    /// socket. The writer registry is untouched, so active writers
    /// survive; the old accept loop is cancelled but any connection it
    /// already accepted keeps running to completion in its own task
    /// (`spec.md` §4.H "in-flight control connections are allowed to
    /// finish").
    pub async fn reload(self: &Arc<Self>) -> Result<(), SupervisorError> {
        let reloaded = Config::load(&self.conffile)?;
        let mut config = self.config.lock().clone();
        config.apply_reloadable(reloaded);

        if let Some(handle) = self.logging.lock().as_mut() {
            handle.reload(&config.log_file, config.log_level)?;
        }

        let backend = (self.backend_factory)(&config)?;
        backend
            .set_backend_options(true, true)
            .await
            .map_err(|err| SupervisorError::Backend(err.to_string()))?;
        let updater = self.build_updater(&config, backend);
        self.rebind_listener(&config, updater)?;

        *self.config.lock() = config;
        tracing::info!("configuration reloaded");
        Ok(())
    }

    /// `running -> stopping -> stopped`: cancel the startup task, close
    /// the control socket, then cancel and await every active writer.
    pub async fn stop(&self) {
        tracing::info!("stopping");
        if let Some(cancel) = self.reconcile_cancel.lock().take() {
            cancel.cancel();
        }

        let listener = self.listener.lock().take();
        if let Some(listener) = listener {
            listener.cancel.cancel();
            let _ = listener.handle.await;
        }

        let socket_path = self.config.lock().control_socket.clone();
        let _ = std::fs::remove_file(&socket_path);

        self.registry.cancel_and_await_all().await;

        let pid_file = self.config.lock().pid_file.clone();
        pidfile::release(&pid_file);
        tracing::info!("stopped");
    }

    fn build_updater(&self, config: &Config, backend: B) -> Updater<B, C> {
        Updater::new(
            backend,
            self.registry.clone(),
            UpdaterConfig {
                depot_id: config.depot_id.clone(),
                pxe_dir: config.pxe_config_dir.clone(),
                default_template: config.pxe_config_template.clone(),
                max_writers: config.max_pxe_config_writers,
            },
        )
    }

    fn rebind_listener(&self, config: &Config, updater: Updater<B, C>) -> Result<(), SupervisorError> {
        let socket =
            listener::bind(&config.control_socket).map_err(|source| SupervisorError::Bind { path: config.control_socket.clone(), source })?;
        let ctx = Arc::new(ListenCtx {
            updater,
            registry: self.registry.clone(),
            connections: self.connections.clone(),
            shutdown: Arc::clone(&self.shutdown),
            max_connections: config.max_control_connections,
        });
        let server = Listener::new(socket, ctx);
        let cancel = CancellationToken::new();
        let server_cancel = cancel.clone();
        let handle = tokio::spawn(server.run(server_cancel));

        let previous = self.listener.lock().replace(RunningListener { cancel, handle });
        if let Some(previous) = previous {
            previous.cancel.cancel();
            // Reap in the background rather than awaiting here: the old
            // accept loop may still be mid-`accept` when this runs, and
            // reload must not block on it.
            tokio::spawn(async move {
                let _ = previous.handle.await;
            });
        }
        Ok(())
    }

    fn wire_signals(self: &Arc<Self>) {
        let on_hangup = Arc::clone(self);
        tokio::spawn(async move {
            let Ok(mut hangup) = signal(SignalKind::hangup()) else {
                tracing::warn!("failed to install SIGHUP handler");
                return;
            };
            loop {
                hangup.recv().await;
                tracing::info!("received SIGHUP, reloading");
                if let Err(err) = on_hangup.reload().await {
                    tracing::error!(%err, "reload failed");
                }
            }
        });

        let on_term = Arc::clone(self);
        tokio::spawn(async move {
            let (Ok(mut term), Ok(mut int)) = (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) else {
                tracing::warn!("failed to install SIGTERM/SIGINT handlers");
                return;
            };
            tokio::select! {
                _ = term.recv() => tracing::info!("received SIGTERM"),
                _ = int.recv() => tracing::info!("received SIGINT"),
            }
            on_term.shutdown.notify_one();
        });
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
