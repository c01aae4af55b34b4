// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The boot-configuration updater (`spec.md` §4.E): the ten-step
//! procedure that turns a `hostId` into a freshly materialised PXE
//! writer, consulting the backend port and the template renderer and
//! evicting whatever writer previously served this host.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pxe_backend::{Backend, BackendError};
use pxe_core::{
    pxe_config_name, AppendBag, BootAction, Clock, HostCanonicalizeError, HostId, ProductId, ProductOnClient,
};
use pxe_template::{PropertyMap, TemplateError};
use thiserror::Error;

use crate::registry::WriterRegistry;
use crate::writer::{self, WriterError, WriterOutcome};

const DEFAULT_SUCCESS_MESSAGE: &str = "Boot configuration updated";
const PXE_BOOT_CONFIG_READ: &str = "pxe boot configuration read";

/// Static configuration the updater needs beyond the backend and the
/// registry — the pieces `spec.md` §6 names as config-file keys.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// The depot this daemon instance serves (`spec.md` §4.A `listProductsOnDepot`).
    pub depot_id: String,
    /// Directory the per-host FIFOs are created in (`pxe config dir`).
    pub pxe_dir: PathBuf,
    /// Default template path (`pxe config template`). Relative
    /// `pxeConfigTemplate` overrides are resolved against its parent
    /// directory (`spec.md` §4.E step 5).
    pub default_template: PathBuf,
    /// Bound on simultaneously active writers (`max pxe config writers`).
    pub max_writers: usize,
}

#[derive(Debug, Error)]
pub enum UpdaterError {
    #[error("invalid host id: {0}")]
    InvalidHost(#[from] HostCanonicalizeError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("no address for host")]
    NoAddress,
    #[error("address collision: {pxefile} is already assigned to {other}")]
    AddressCollision { pxefile: PathBuf, other: HostId },
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Writer(#[from] WriterError),
    #[error("too many active pxe config writers (max {max})")]
    TooManyWriters { max: usize },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

struct Inner<B, C: Clock> {
    backend: B,
    registry: WriterRegistry<C>,
    config: UpdaterConfig,
}

/// The boot-config updater. Cheap to clone — every control-connection
/// handler and the startup reconciliation task hold their own clone.
pub struct Updater<B, C: Clock> {
    inner: Arc<Inner<B, C>>,
}

impl<B, C: Clock> Clone for Updater<B, C> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<B, C> Updater<B, C>
where
    B: Backend,
    C: Clock,
{
    pub fn new(backend: B, registry: WriterRegistry<C>, config: UpdaterConfig) -> Self {
        Self { inner: Arc::new(Inner { backend, registry, config }) }
    }

    /// Run the ten steps of `spec.md` §4.E for `host_id_raw`, under that
    /// host's serialising slot. `template_override`, when set, is the
    /// `<cachePath>` argument of `update <hostId> <cachePath>` — it
    /// replaces template resolution (step 5) entirely.
    pub async fn update(&self, host_id_raw: &str, template_override: Option<PathBuf>) -> Result<String, UpdaterError> {
        let host_id = HostId::canonicalize(host_id_raw)?;
        let _slot = self.inner.registry.acquire_slot(&host_id).await;
        self.update_locked(&host_id, template_override).await
    }

    async fn update_locked(&self, host_id: &HostId, template_override: Option<PathBuf>) -> Result<String, UpdaterError> {
        // Step 2: evict and await any existing writer for this host.
        self.inner.registry.evict(host_id).await;

        // Step 3: outstanding netboot actions.
        let actions = self
            .inner
            .backend
            .list_netboot_actions(std::slice::from_ref(host_id), &BootAction::NETBOOT_ACTIONS)
            .await?;
        if actions.is_empty() {
            return Ok(DEFAULT_SUCCESS_MESSAGE.to_string());
        }

        // Step 4: resolve versions, dropping survivors with no depot match.
        let product_ids: Vec<ProductId> = actions.iter().map(|a| a.product_id.clone()).collect();
        let on_depot = self.inner.backend.list_products_on_depot(&self.inner.config.depot_id, &product_ids).await?;
        let mut resolved: Vec<ProductOnClient> = Vec::new();
        for mut poc in actions {
            if let Some(depot) = on_depot.iter().find(|d| d.product_id == poc.product_id) {
                poc.product_version = depot.product_version.clone();
                poc.package_version = depot.package_version.clone();
                resolved.push(poc);
            }
        }
        if resolved.is_empty() {
            return Ok(DEFAULT_SUCCESS_MESSAGE.to_string());
        }

        // Step 5: template resolution.
        let (template_path, used_default) = match &template_override {
            Some(path) => (path.clone(), false),
            None => self.resolve_template(host_id, &resolved).await?,
        };

        // Step 6: derive pxefile from MAC (preferred) or IPv4.
        let host_record = self.inner.backend.get_host(host_id).await?;
        let pxe_name = pxe_config_name(host_record.mac.as_deref(), host_record.ipv4.as_deref())
            .map_err(|_| UpdaterError::NoAddress)?;
        let pxefile = self.inner.config.pxe_dir.join(&pxe_name);

        // Step 7: handle a pre-existing file at the target path.
        if pxefile.exists() {
            match self.inner.registry.find_by_pxefile(&pxefile) {
                Some(owner) if &owner == host_id => {
                    tracing::info!(%host_id, pxefile = %pxefile.display(), "pxe file already exists for this host");
                    return Ok(DEFAULT_SUCCESS_MESSAGE.to_string());
                }
                Some(owner) => {
                    return Err(UpdaterError::AddressCollision { pxefile, other: owner });
                }
                None => std::fs::remove_file(&pxefile)?,
            }
        }

        if self.inner.registry.len() >= self.inner.config.max_writers {
            return Err(UpdaterError::TooManyWriters { max: self.inner.config.max_writers });
        }

        // Step 8: compose the append bag.
        let product_id = resolved.last().map(|p| p.product_id.as_str()).unwrap_or_default();
        let bootimage_append =
            self.inner.backend.get_config_state(host_id, "opsi-linux-bootimage.append").await?.into_iter().next().unwrap_or_default();
        let mut append = AppendBag::parse_tokens(&bootimage_append);
        let mut computed = AppendBag::new();
        if let Some(key) = &host_record.host_key {
            computed.set("pckey", key.expose().clone());
        }
        computed.set("hn", host_id.short_name());
        computed.set("dn", host_id.domain());
        computed.set("product", product_id);
        computed.set("service", service_url(&self.inner.backend, host_id).await?);
        append.merge_over(&computed);

        // Step 9: property map for `%propertyId%` substitution.
        let property_states = self.inner.backend.get_product_property_states(host_id, &product_ids).await?;
        let mut properties = PropertyMap::new();
        for state in property_states {
            properties.set_values(state.property_id, &state.values);
        }

        // Step 10: render, create the writer, register it.
        let rendered = pxe_template::render(&template_path, &properties, &append, host_id.short_name())?;
        let completion = self.completion_callback(host_id.clone(), resolved.clone(), used_default);
        let handle = writer::spawn(pxefile.clone(), rendered, completion)?;
        self.inner.registry.insert(host_id.clone(), pxefile, template_path, append, resolved, handle);

        Ok(DEFAULT_SUCCESS_MESSAGE.to_string())
    }

    async fn resolve_template(
        &self,
        host_id: &HostId,
        resolved: &[ProductOnClient],
    ) -> Result<(PathBuf, bool), UpdaterError> {
        let mut templates: Vec<String> = Vec::new();
        for poc in resolved {
            let product = self
                .inner
                .backend
                .get_netboot_product(&poc.product_id, &poc.product_version, &poc.package_version)
                .await?;
            if let Some(template) = product.pxe_config_template.filter(|t| !t.is_empty()) {
                templates.push(template);
            }
        }

        let distinct: HashSet<&str> = templates.iter().map(String::as_str).collect();
        if distinct.len() > 1 {
            tracing::error!(%host_id, templates = ?templates, "products disagree on pxeConfigTemplate; keeping last-seen");
        }

        match templates.into_iter().last() {
            Some(template) => {
                let path = resolve_relative(&template, &self.inner.config.default_template);
                let used_default = path == self.inner.config.default_template;
                Ok((path, used_default))
            }
            None => Ok((self.inner.config.default_template.clone(), true)),
        }
    }

    fn completion_callback(
        &self,
        host_id: HostId,
        products: Vec<ProductOnClient>,
        used_default: bool,
    ) -> impl FnOnce(WriterOutcome) + Send + 'static {
        let updater = self.clone();
        move |outcome| {
            updater.inner.registry.remove(&host_id);
            if outcome != WriterOutcome::Success {
                return;
            }
            tokio::spawn(async move {
                updater.finish_success(host_id, products, used_default).await;
            });
        }
    }

    async fn finish_success(&self, host_id: HostId, products: Vec<ProductOnClient>, used_default: bool) {
        let mut updates = products.clone();
        for poc in &mut updates {
            poc.action_progress = PXE_BOOT_CONFIG_READ.to_string();
            if !used_default {
                poc.action_request = BootAction::None;
            }
        }
        if let Err(err) = self.inner.backend.update_product_on_clients(&updates).await {
            tracing::warn!(%host_id, %err, "failed to flush product-on-client updates");
        }

        if products.iter().any(|p| p.action_request == BootAction::Always) {
            if let Err(err) = self.update(host_id.as_str(), None).await {
                tracing::warn!(%host_id, %err, "always-reschedule update failed");
            }
        }
    }
}

async fn service_url<B: Backend>(backend: &B, host_id: &HostId) -> Result<String, BackendError> {
    let mut url = backend
        .get_config_state(host_id, "clientconfig.configserver.url")
        .await?
        .into_iter()
        .next()
        .unwrap_or_default();
    if !url.is_empty() && !url.ends_with("/rpc") {
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str("rpc");
    }
    Ok(url)
}

fn resolve_relative(template: &str, default_template: &Path) -> PathBuf {
    let candidate = Path::new(template);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        default_template.parent().map(|dir| dir.join(candidate)).unwrap_or_else(|| candidate.to_path_buf())
    }
}

#[cfg(test)]
#[path = "updater_tests.rs"]
mod tests;
