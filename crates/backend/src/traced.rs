// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logging wrapper around a [`Backend`] implementation.

use crate::{Backend, BackendError, ProductPropertyState};
use async_trait::async_trait;
use pxe_core::{BootAction, HostId, HostRecord, NetbootProduct, ProductId, ProductOnClient, ProductOnDepot};

/// Wraps a [`Backend`] and logs every call at `debug`, redacting the host
/// key before it can reach a log line.
#[derive(Clone)]
pub struct TracedBackend<B> {
    inner: B,
}

impl<B: Backend> TracedBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<B: Backend> Backend for TracedBackend<B> {
    async fn list_depot_clients(&self, depot_id: &str) -> Result<Vec<HostId>, BackendError> {
        tracing::debug!(depot_id, "list_depot_clients");
        let result = self.inner.list_depot_clients(depot_id).await;
        if let Err(err) = &result {
            tracing::debug!(depot_id, %err, "list_depot_clients failed");
        }
        result
    }

    async fn list_netboot_actions(
        &self,
        host_ids: &[HostId],
        requested_actions: &[BootAction],
    ) -> Result<Vec<ProductOnClient>, BackendError> {
        tracing::debug!(count = host_ids.len(), "list_netboot_actions");
        self.inner.list_netboot_actions(host_ids, requested_actions).await
    }

    async fn get_host(&self, host_id: &HostId) -> Result<HostRecord, BackendError> {
        tracing::debug!(%host_id, "get_host");
        let result = self.inner.get_host(host_id).await;
        if let Err(err) = &result {
            tracing::debug!(%host_id, %err, "get_host failed");
        }
        // HostRecord's host_key is a Confidential, so logging the whole
        // record here (were we to do so) would stay redacted automatically.
        result
    }

    async fn list_products_on_depot(
        &self,
        depot_id: &str,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductOnDepot>, BackendError> {
        tracing::debug!(depot_id, count = product_ids.len(), "list_products_on_depot");
        self.inner.list_products_on_depot(depot_id, product_ids).await
    }

    async fn get_netboot_product(
        &self,
        product_id: &ProductId,
        product_version: &str,
        package_version: &str,
    ) -> Result<NetbootProduct, BackendError> {
        tracing::debug!(%product_id, product_version, package_version, "get_netboot_product");
        self.inner
            .get_netboot_product(product_id, product_version, package_version)
            .await
    }

    async fn get_config_state(&self, host_id: &HostId, config_id: &str) -> Result<Vec<String>, BackendError> {
        tracing::debug!(%host_id, config_id, "get_config_state");
        self.inner.get_config_state(host_id, config_id).await
    }

    async fn get_product_property_states(
        &self,
        host_id: &HostId,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductPropertyState>, BackendError> {
        tracing::debug!(%host_id, count = product_ids.len(), "get_product_property_states");
        self.inner.get_product_property_states(host_id, product_ids).await
    }

    async fn update_product_on_clients(&self, updates: &[ProductOnClient]) -> Result<(), BackendError> {
        tracing::debug!(count = updates.len(), "update_product_on_clients");
        self.inner.update_product_on_clients(updates).await
    }

    async fn set_backend_options(
        &self,
        add_product_property_state_defaults: bool,
        add_config_state_defaults: bool,
    ) -> Result<(), BackendError> {
        tracing::debug!(
            add_product_property_state_defaults,
            add_config_state_defaults,
            "set_backend_options"
        );
        self.inner
            .set_backend_options(add_product_property_state_defaults, add_config_state_defaults)
            .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
