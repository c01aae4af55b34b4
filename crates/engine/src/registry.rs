// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The writer registry (`spec.md` §4.D): the set of active [`WriterEntry`]
//! values, keyed by `hostId` and by `pxefile` path, with the per-host
//! uniqueness invariant and the per-host slot that serialises concurrent
//! `update <host>` calls.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use pxe_core::{AppendBag, Clock, HostId, ProductOnClient};
use tokio::sync::Mutex as AsyncMutex;

use crate::writer::WriterHandle;

/// A snapshot of one active boot configuration (`spec.md` §3).
#[derive(Debug, Clone)]
pub struct WriterSnapshot {
    pub host_id: HostId,
    pub pxefile: PathBuf,
    pub template_path: PathBuf,
    pub append: AppendBag,
    pub products: Vec<ProductOnClient>,
    pub started_at: i64,
}

struct WriterEntry {
    snapshot: WriterSnapshot,
    handle: WriterHandle,
}

struct State {
    by_host: HashMap<HostId, WriterEntry>,
    locks: HashMap<HostId, Arc<AsyncMutex<()>>>,
}

/// Concurrent set of active writers (`spec.md` §4.D).
///
/// All mutation goes through the single `parking_lot::Mutex` in `state`;
/// no I/O is ever performed while it is held (`spec.md` §5). Per-host
/// mutual exclusion is a *separate* `tokio::sync::Mutex<()>`, created
/// lazily and handed out by `Arc` clone so the async guard can be held
/// across the `.await` points in [`crate::updater::update`] without
/// holding the registry's sync lock.
#[derive(Clone)]
pub struct WriterRegistry<C: Clock> {
    state: Arc<Mutex<State>>,
    clock: C,
}

impl<C: Clock> WriterRegistry<C> {
    pub fn new(clock: C) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                by_host: HashMap::new(),
                locks: HashMap::new(),
            })),
            clock,
        }
    }

    /// Acquire the per-host slot (`spec.md` §4.D transition table). Holding
    /// the returned guard serialises any other `update <host_id>` call
    /// against this one; it must be held for the whole of an updater run.
    pub async fn acquire_slot(&self, host_id: &HostId) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut state = self.state.lock();
            state.locks.entry(host_id.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
        };
        lock.lock_owned().await
    }

    /// The active writer for `host_id`, if any (`lookup-by-hostId`).
    pub fn find_by_host(&self, host_id: &HostId) -> Option<WriterSnapshot> {
        self.state.lock().by_host.get(host_id).map(|e| e.snapshot.clone())
    }

    /// The host owning `pxefile`, if any (`lookup-by-pxefile`).
    pub fn find_by_pxefile(&self, pxefile: &std::path::Path) -> Option<HostId> {
        self.state
            .lock()
            .by_host
            .values()
            .find(|e| e.snapshot.pxefile == pxefile)
            .map(|e| e.snapshot.host_id.clone())
    }

    /// All active writer snapshots, for `status` (`spec.md` §4.F).
    pub fn list_all(&self) -> Vec<WriterSnapshot> {
        self.state.lock().by_host.values().map(|e| e.snapshot.clone()).collect()
    }

    /// Register a freshly started writer. The caller must have already
    /// evicted any prior entry for this host (`scheduling -> active`).
    pub fn insert(
        &self,
        host_id: HostId,
        pxefile: PathBuf,
        template_path: PathBuf,
        append: AppendBag,
        products: Vec<ProductOnClient>,
        handle: WriterHandle,
    ) {
        let snapshot = WriterSnapshot {
            host_id: host_id.clone(),
            pxefile,
            template_path,
            append,
            products,
            started_at: self.clock.now(),
        };
        self.state.lock().by_host.insert(host_id, WriterEntry { snapshot, handle });
    }

    /// Remove the entry for `host_id` without cancelling it — used by the
    /// writer's own completion callback, which runs after the writer has
    /// already reached a terminal state.
    pub fn remove(&self, host_id: &HostId) {
        self.state.lock().by_host.remove(host_id);
    }

    /// Evict and await termination of any existing writer for `host_id`
    /// (`active -> evicting -> scheduling`, `spec.md` §4.E step 2). A
    /// no-op if there is none.
    pub async fn evict(&self, host_id: &HostId) {
        let entry = self.state.lock().by_host.remove(host_id);
        if let Some(entry) = entry {
            entry.handle.cancel();
            entry.handle.join().await;
        }
    }

    /// Cancel and await every active writer (`spec.md` §4.H `stop`).
    pub async fn cancel_and_await_all(&self) {
        let entries: Vec<WriterEntry> = {
            let mut state = self.state.lock();
            state.by_host.drain().map(|(_, e)| e).collect()
        };
        for entry in entries {
            entry.handle.cancel();
            entry.handle.join().await;
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().by_host.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
