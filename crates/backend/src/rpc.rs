// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-RPC-over-HTTP client for the real opsi config service.
//!
//! The opsi service exposes its backend as a single JSON-RPC endpoint:
//! every method in `spec.md` §4.A is one POST of `{method, params, id}`
//! to that endpoint. This adapter only implements the method catalogue
//! [`Backend`] needs; the full opsi RPC surface is out of scope
//! (`spec.md` §1).

use crate::{Backend, BackendError, ProductPropertyState};
use async_trait::async_trait;
use pxe_core::{BootAction, Confidential, HostId, HostRecord, NetbootProduct, ProductId, ProductOnClient, ProductOnDepot};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Serialize)]
struct RpcRequest<'a> {
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    message: String,
}

struct Inner {
    client: reqwest::Client,
    url: String,
    username: String,
    password: Confidential<String>,
    next_id: AtomicU64,
}

/// A [`Backend`] implementation that talks JSON-RPC to an opsiconfd
/// instance over HTTP(S), authenticating with HTTP basic auth on every
/// request (stored service-account credentials, matching
/// `opsipxeconfd`'s historical connection style — no session cookie).
#[derive(Clone)]
pub struct OpsiRpcBackend {
    inner: Arc<Inner>,
}

impl OpsiRpcBackend {
    /// Build a client against `url` (the opsiconfd RPC endpoint).
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                url: url.into(),
                username: username.into(),
                password: Confidential::new(password.into()),
                next_id: AtomicU64::new(1),
            }),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, BackendError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest { id, method, params };
        let response = self
            .inner
            .client
            .post(&self.inner.url)
            .basic_auth(&self.inner.username, Some(self.inner.password.expose()))
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;
        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        if let Some(error) = parsed.error {
            return Err(BackendError::Rpc(error.message));
        }
        Ok(parsed.result)
    }

    fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, BackendError> {
        serde_json::from_value(value).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Backend for OpsiRpcBackend {
    async fn list_depot_clients(&self, depot_id: &str) -> Result<Vec<HostId>, BackendError> {
        let result = self
            .call("host_getIdents", json!({"type": "OpsiClient", "depotId": depot_id}))
            .await?;
        let raw: Vec<String> = Self::decode(result)?;
        raw.into_iter().map(|id| Ok(HostId::new(id))).collect()
    }

    async fn list_netboot_actions(
        &self,
        host_ids: &[HostId],
        requested_actions: &[BootAction],
    ) -> Result<Vec<ProductOnClient>, BackendError> {
        let ids: Vec<&str> = host_ids.iter().map(HostId::as_str).collect();
        let result = self
            .call(
                "productOnClient_getObjects",
                json!([{"productType": "NetbootProduct", "clientId": ids}]),
            )
            .await?;

        #[derive(Deserialize)]
        struct Wire {
            #[serde(rename = "clientId")]
            client_id: String,
            #[serde(rename = "productId")]
            product_id: String,
            #[serde(rename = "productVersion", default)]
            product_version: String,
            #[serde(rename = "packageVersion", default)]
            package_version: String,
            #[serde(rename = "actionRequest", default)]
            action_request: String,
            #[serde(rename = "actionProgress", default)]
            action_progress: String,
        }

        let raw: Vec<Wire> = Self::decode(result)?;
        let wanted: Vec<&str> = requested_actions.iter().map(|a| a.as_str()).collect();
        Ok(raw
            .into_iter()
            .filter(|w| wanted.is_empty() || wanted.contains(&w.action_request.as_str()))
            .map(|w| ProductOnClient {
                host_id: HostId::new(w.client_id),
                product_id: ProductId::new(w.product_id),
                product_version: w.product_version,
                package_version: w.package_version,
                action_request: w.action_request.parse().unwrap_or(BootAction::None),
                action_progress: w.action_progress,
            })
            .collect())
    }

    async fn get_host(&self, host_id: &HostId) -> Result<HostRecord, BackendError> {
        let result = self
            .call("host_getObjects", json!([{"id": host_id.as_str()}]))
            .await?;

        #[derive(Deserialize)]
        struct Wire {
            #[serde(rename = "hardwareAddress")]
            hardware_address: Option<String>,
            #[serde(rename = "ipAddress")]
            ip_address: Option<String>,
            #[serde(rename = "opsiHostKey")]
            opsi_host_key: Option<String>,
        }

        let mut raw: Vec<Wire> = Self::decode(result)?;
        let wire = raw
            .pop()
            .ok_or_else(|| BackendError::UnknownHost(host_id.to_string()))?;
        Ok(HostRecord {
            mac: wire.hardware_address,
            ipv4: wire.ip_address,
            host_key: wire.opsi_host_key.map(Confidential::new),
        })
    }

    async fn list_products_on_depot(
        &self,
        depot_id: &str,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductOnDepot>, BackendError> {
        let ids: Vec<&str> = product_ids.iter().map(ProductId::as_str).collect();
        let mut filter = json!({"depotId": depot_id, "productType": "NetbootProduct"});
        if !ids.is_empty() {
            filter["productId"] = json!(ids);
        }
        let result = self.call("productOnDepot_getObjects", json!([filter])).await?;

        #[derive(Deserialize)]
        struct Wire {
            #[serde(rename = "productId")]
            product_id: String,
            #[serde(rename = "productVersion")]
            product_version: String,
            #[serde(rename = "packageVersion")]
            package_version: String,
        }

        let raw: Vec<Wire> = Self::decode(result)?;
        Ok(raw
            .into_iter()
            .map(|w| ProductOnDepot {
                product_id: ProductId::new(w.product_id),
                product_version: w.product_version,
                package_version: w.package_version,
            })
            .collect())
    }

    async fn get_netboot_product(
        &self,
        product_id: &ProductId,
        product_version: &str,
        package_version: &str,
    ) -> Result<NetbootProduct, BackendError> {
        let result = self
            .call(
                "product_getObjects",
                json!([{
                    "id": product_id.as_str(),
                    "productVersion": product_version,
                    "packageVersion": package_version,
                }]),
            )
            .await?;

        #[derive(Deserialize)]
        struct Wire {
            #[serde(rename = "pxeConfigTemplate", default)]
            pxe_config_template: Option<String>,
        }

        let mut raw: Vec<Wire> = Self::decode(result)?;
        Ok(raw
            .pop()
            .map(|w| NetbootProduct {
                pxe_config_template: w.pxe_config_template.filter(|s| !s.is_empty()),
            })
            .unwrap_or_default())
    }

    async fn get_config_state(&self, host_id: &HostId, config_id: &str) -> Result<Vec<String>, BackendError> {
        let result = self
            .call(
                "configState_getValues",
                json!({"configIds": [config_id], "objectIds": [host_id.as_str()], "withDefaults": true}),
            )
            .await?;

        let mut table: std::collections::HashMap<String, std::collections::HashMap<String, Vec<String>>> =
            Self::decode(result)?;
        Ok(table
            .remove(host_id.as_str())
            .and_then(|mut m| m.remove(config_id))
            .unwrap_or_default())
    }

    async fn get_product_property_states(
        &self,
        host_id: &HostId,
        product_ids: &[ProductId],
    ) -> Result<Vec<ProductPropertyState>, BackendError> {
        let ids: Vec<&str> = product_ids.iter().map(ProductId::as_str).collect();
        let mut filter = json!({"objectId": host_id.as_str()});
        if !ids.is_empty() {
            filter["productId"] = json!(ids);
        }
        let result = self.call("productPropertyState_getObjects", json!([filter])).await?;

        #[derive(Deserialize)]
        struct Wire {
            #[serde(rename = "productId")]
            product_id: String,
            #[serde(rename = "propertyId")]
            property_id: String,
            values: Vec<String>,
        }

        let raw: Vec<Wire> = Self::decode(result)?;
        Ok(raw
            .into_iter()
            .map(|w| ProductPropertyState {
                product_id: ProductId::new(w.product_id),
                property_id: w.property_id,
                values: w.values,
            })
            .collect())
    }

    async fn update_product_on_clients(&self, updates: &[ProductOnClient]) -> Result<(), BackendError> {
        let wire: Vec<Value> = updates
            .iter()
            .map(|poc| {
                json!({
                    "clientId": poc.host_id.as_str(),
                    "productId": poc.product_id.as_str(),
                    "productVersion": poc.product_version,
                    "packageVersion": poc.package_version,
                    "actionRequest": poc.action_request.as_str(),
                    "actionProgress": poc.action_progress,
                })
            })
            .collect();
        self.call("productOnClient_updateObjects", json!([wire])).await?;
        Ok(())
    }

    async fn set_backend_options(
        &self,
        add_product_property_state_defaults: bool,
        add_config_state_defaults: bool,
    ) -> Result<(), BackendError> {
        self.call(
            "backend_setOptions",
            json!([{
                "addProductPropertyStateDefaults": add_product_property_state_defaults,
                "addConfigStateDefaults": add_config_state_defaults,
            }]),
        )
        .await?;
        Ok(())
    }
}
