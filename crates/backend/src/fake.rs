// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory backend for tests.

use crate::{Backend, BackendError, ProductPropertyState};
use async_trait::async_trait;
use parking_lot::Mutex;
use pxe_core::{BootAction, HostId, HostRecord, NetbootProduct, ProductId, ProductOnClient, ProductOnDepot};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct FakeState {
    depot_clients: HashMap<String, Vec<HostId>>,
    hosts: HashMap<HostId, HostRecord>,
    netboot_actions: HashMap<HostId, Vec<ProductOnClient>>,
    products_on_depot: HashMap<String, Vec<ProductOnDepot>>,
    netboot_products: HashMap<(ProductId, String, String), NetbootProduct>,
    config_states: HashMap<(HostId, String), Vec<String>>,
    property_states: HashMap<HostId, Vec<ProductPropertyState>>,
    updates: Vec<ProductOnClient>,
    backend_options: Option<(bool, bool)>,
}

/// Builder-style in-memory stand-in for [`Backend`].
///
/// Every accessor other than `updates()`/`backend_options()` returns
/// whatever was seeded via the `with_*`/`seed_*` methods; nothing is
/// derived or validated, so tests control every input explicitly.
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_depot_clients(&self, depot_id: &str, hosts: Vec<HostId>) {
        self.inner.lock().depot_clients.insert(depot_id.to_string(), hosts);
    }

    pub fn seed_host(&self, host_id: HostId, record: HostRecord) {
        self.inner.lock().hosts.insert(host_id, record);
    }

    pub fn seed_netboot_actions(&self, host_id: HostId, actions: Vec<ProductOnClient>) {
        self.inner.lock().netboot_actions.insert(host_id, actions);
    }

    pub fn seed_products_on_depot(&self, depot_id: &str, products: Vec<ProductOnDepot>) {
        self.inner
            .lock()
            .products_on_depot
            .insert(depot_id.to_string(), products);
    }

    pub fn seed_netboot_product(
        &self,
        product_id: ProductId,
        product_version: &str,
        package_version: &str,
        product: NetbootProduct,
    ) {
        self.inner.lock().netboot_products.insert(
            (product_id, product_version.to_string(), package_version.to_string()),
            product,
        );
    }

    pub fn seed_config_state(&self, host_id: HostId, config_id: &str, values: Vec<String>) {
        self.inner
            .lock()
            .config_states
            .insert((host_id, config_id.to_string()), values);
    }

    pub fn seed_property_states(&self, host_id: HostId, states: Vec<ProductPropertyState>) {
        self.inner.lock().property_states.insert(host_id, states);
    }

    /// Every update recorded by `update_product_on_clients`, in call order.
    pub fn updates(&self) -> Vec<ProductOnClient> {
        self.inner.lock().updates.clone()
    }

    /// The arguments of the most recent `set_backend_options` call, if any.
    pub fn backend_options(&self) -> Option<(bool, bool)> {
        self.inner.lock().backend_options
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_depot_clients(&self, depot_id: &str) -> Result<Vec<HostId>, BackendError> {
        Ok(self
            .inner
            .lock()
            .depot_clients
            .get(depot_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_netboot_actions(
        &self,
        host_ids: &[HostId],
        requested_actions: &[BootAction],
    ) -> Result<Vec<ProductOnClient>, BackendError> {
        let state = self.inner.lock();
        let mut out = Vec::new();
        for host_id in host_ids {
            let Some(actions) = state.netboot_actions.get(host_id) else {
                continue;
            };
            for poc in actions {
                if requested_actions.is_empty() || requested_actions.contains(&poc.action_request) {
                    out.push(poc.clone());
                }
            }
        }
        Ok(out)
    }

    async fn get_host(&self, host_id: &HostId) -> Result<HostRecord, BackendError> {
        self.inner
            .lock()
            .hosts
            .get(host_id)
            .cloned()
            .ok_or_else(|| BackendError::UnknownHost(host_id.to_string()))
    }

    async fn list_products_on_depot(
        &self,
        depot_id: &str,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductOnDepot>, BackendError> {
        let state = self.inner.lock();
        let all = state.products_on_depot.get(depot_id).cloned().unwrap_or_default();
        if product_ids.is_empty() {
            Ok(all)
        } else {
            Ok(all
                .into_iter()
                .filter(|p| product_ids.contains(&p.product_id))
                .collect())
        }
    }

    async fn get_netboot_product(
        &self,
        product_id: &ProductId,
        product_version: &str,
        package_version: &str,
    ) -> Result<NetbootProduct, BackendError> {
        Ok(self
            .inner
            .lock()
            .netboot_products
            .get(&(product_id.clone(), product_version.to_string(), package_version.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_config_state(&self, host_id: &HostId, config_id: &str) -> Result<Vec<String>, BackendError> {
        Ok(self
            .inner
            .lock()
            .config_states
            .get(&(host_id.clone(), config_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_product_property_states(
        &self,
        host_id: &HostId,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductPropertyState>, BackendError> {
        let state = self.inner.lock();
        let all = state.property_states.get(host_id).cloned().unwrap_or_default();
        if product_ids.is_empty() {
            Ok(all)
        } else {
            Ok(all
                .into_iter()
                .filter(|p| product_ids.contains(&p.product_id))
                .collect())
        }
    }

    async fn update_product_on_clients(&self, updates: &[ProductOnClient]) -> Result<(), BackendError> {
        self.inner.lock().updates.extend_from_slice(updates);
        Ok(())
    }

    async fn set_backend_options(
        &self,
        add_product_property_state_defaults: bool,
        add_config_state_defaults: bool,
    ) -> Result<(), BackendError> {
        self.inner.lock().backend_options =
            Some((add_product_property_state_defaults, add_config_state_defaults));
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
