// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pxe-backend: the opsi backend port and its implementations.
//!
//! [`Backend`] is the seam between the daemon's update logic and the
//! opsiconfd JSON-RPC service. [`OpsiRpcBackend`] talks to the real
//! service; [`FakeBackend`] is an in-memory stand-in for tests; and
//! [`TracedBackend`] wraps either one to log every call.

mod rpc;
mod traced;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBackend;

pub use rpc::OpsiRpcBackend;
pub use traced::TracedBackend;

use async_trait::async_trait;
use pxe_core::{HostId, HostRecord, NetbootProduct, ProductId, ProductOnClient, ProductOnDepot};
use thiserror::Error;

/// Errors surfaced by a [`Backend`] implementation.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("opsi service unreachable: {0}")]
    Unreachable(String),
    #[error("opsi service returned an error: {0}")]
    Rpc(String),
    #[error("unexpected response shape: {0}")]
    Decode(String),
    #[error("unknown host: {0}")]
    UnknownHost(String),
}

/// The opsi backend operations the daemon needs (`spec.md` §4.A).
///
/// Implementations must be cheap to clone — the daemon hands out one
/// clone per connection/update job rather than sharing a single
/// `&Backend` across tasks.
#[async_trait]
pub trait Backend: Clone + Send + Sync + 'static {
    /// All client host IDs assigned to the given depot.
    async fn list_depot_clients(&self, depot_id: &str) -> Result<Vec<HostId>, BackendError>;

    /// Outstanding netboot-relevant product actions for the given hosts.
    ///
    /// `requested_actions` restricts the result to those action types when
    /// non-empty; an empty slice means "all netboot actions".
    async fn list_netboot_actions(
        &self,
        host_ids: &[HostId],
        requested_actions: &[pxe_core::BootAction],
    ) -> Result<Vec<ProductOnClient>, BackendError>;

    /// The network identity and confidential host key for one client.
    async fn get_host(&self, host_id: &HostId) -> Result<HostRecord, BackendError>;

    /// Netboot product versions installed on the given depot, restricted to
    /// `product_ids` when non-empty.
    async fn list_products_on_depot(
        &self,
        depot_id: &str,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductOnDepot>, BackendError>;

    /// The netboot product record for one (product, version) pair.
    async fn get_netboot_product(
        &self,
        product_id: &ProductId,
        product_version: &str,
        package_version: &str,
    ) -> Result<NetbootProduct, BackendError>;

    /// Config-state values for `config_id` on `host_id`, most specific
    /// first, falling back to the config's defaults.
    async fn get_config_state(
        &self,
        host_id: &HostId,
        config_id: &str,
    ) -> Result<Vec<String>, BackendError>;

    /// Product property values for `host_id`, restricted to `product_ids`.
    async fn get_product_property_states(
        &self,
        host_id: &HostId,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductPropertyState>, BackendError>;

    /// Persist the given client product actions/progress back to the
    /// service.
    async fn update_product_on_clients(
        &self,
        updates: &[ProductOnClient],
    ) -> Result<(), BackendError>;

    /// Toggle default-filling behaviour on the service connection
    /// (`spec.md` §4.A); called once at startup.
    async fn set_backend_options(
        &self,
        add_product_property_state_defaults: bool,
        add_config_state_defaults: bool,
    ) -> Result<(), BackendError>;
}

/// One property/value-list pair as returned by
/// `getProductPropertyStates`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPropertyState {
    pub product_id: ProductId,
    pub property_id: String,
    pub values: Vec<String>,
}
