// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup reconciliation (`spec.md` §4.G): once, at boot, materialise a
//! pipe for every client of this depot that has a pending netboot
//! action. Cooperatively cancellable — on `stop`, the current host's
//! update is allowed to finish, then the loop exits.

use pxe_core::{BootAction, Clock, HostId};
use pxe_backend::Backend;
use tokio_util::sync::CancellationToken;

use crate::updater::Updater;

/// Runs [`Reconciler::run`] once per daemon startup.
pub struct Reconciler<B, C: Clock> {
    backend: B,
    updater: Updater<B, C>,
    depot_id: String,
}

impl<B, C> Reconciler<B, C>
where
    B: Backend,
    C: Clock,
{
    pub fn new(backend: B, updater: Updater<B, C>, depot_id: impl Into<String>) -> Self {
        Self { backend, updater, depot_id: depot_id.into() }
    }

    /// Enumerate depot clients with a pending netboot action and call the
    /// updater for each, skipping and logging per-host failures
    /// (`spec.md` §4.G, §7 kind 2) and stopping early if `cancel` fires.
    pub async fn run(&self, cancel: &CancellationToken) {
        let hosts = match self.backend.list_depot_clients(&self.depot_id).await {
            Ok(hosts) => hosts,
            Err(err) => {
                tracing::error!(depot_id = %self.depot_id, %err, "startup reconciliation: failed to list depot clients");
                return;
            }
        };
        if hosts.is_empty() {
            tracing::info!(depot_id = %self.depot_id, "startup reconciliation: no clients assigned to this depot");
            return;
        }

        let pending = match self.backend.list_netboot_actions(&hosts, &BootAction::NETBOOT_ACTIONS).await {
            Ok(actions) => dedup_hosts(actions.into_iter().map(|a| a.host_id)),
            Err(err) => {
                tracing::error!(depot_id = %self.depot_id, %err, "startup reconciliation: failed to list netboot actions");
                return;
            }
        };

        tracing::info!(count = pending.len(), "startup reconciliation: materialising pending boot configurations");
        for host_id in pending {
            if cancel.is_cancelled() {
                tracing::info!("startup reconciliation cancelled");
                break;
            }
            match self.updater.update(host_id.as_str(), None).await {
                Ok(_) => tracing::debug!(%host_id, "startup reconciliation updated host"),
                Err(err) => tracing::warn!(%host_id, %err, "startup reconciliation failed for host"),
            }
        }
    }
}

fn dedup_hosts(iter: impl Iterator<Item = HostId>) -> Vec<HostId> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for host_id in iter {
        if seen.insert(host_id.clone()) {
            out.push(host_id);
        }
    }
    out
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
