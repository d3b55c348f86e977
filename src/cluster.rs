// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes access used by the instance provider and the controllers.
//!
//! [`ClusterClient`] narrows the Kubernetes API down to the handful of calls
//! the provisioner makes, so provider and garbage collection logic can be
//! tested against an in-memory cluster. [`KubeClusterClient`] is the real
//! implementation on top of [`kube::Client`].

use crate::crd::{Condition, NodeClaim};
use crate::reconcilers::pagination::list_all_paginated;
use crate::reconcilers::retry::{is_not_found, retry_api_call};
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;
use tracing::{debug, info};

/// Install `ring` as the process-wide rustls crypto provider.
///
/// The Kubernetes and ARM clients enable more than one rustls backend, and
/// rustls refuses to pick one itself. Must run before the first
/// [`kube::Client`] is built; calling it again is a no-op.
pub fn install_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        // Lost a race with another installer; either provider is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();
    }
}

/// The Kubernetes calls the provisioner needs.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List Nodes carrying `key=value`.
    async fn list_nodes_with_label(&self, key: &str, value: &str) -> Result<Vec<Node>>;

    /// List every Node.
    async fn list_nodes(&self) -> Result<Vec<Node>>;

    /// List every `NodeClaim`.
    async fn list_node_claims(&self) -> Result<Vec<NodeClaim>>;

    /// Delete a Node. A Node that is already gone is not an error.
    async fn delete_node(&self, name: &str) -> Result<()>;

    /// Replace the status conditions of a `NodeClaim`.
    ///
    /// With a `resource_version` the write only succeeds if the claim has not
    /// changed since that version was read.
    async fn patch_node_claim_conditions(
        &self,
        name: &str,
        resource_version: Option<&str>,
        conditions: &[Condition],
    ) -> Result<()>;
}

/// [`ClusterClient`] backed by the API server.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Wrap a Kubernetes client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    fn node_claims(&self) -> Api<NodeClaim> {
        Api::all(self.client.clone())
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn list_nodes_with_label(&self, key: &str, value: &str) -> Result<Vec<Node>> {
        let selector = format!("{key}={value}");
        let nodes = list_all_paginated(&self.nodes(), ListParams::default().labels(&selector))
            .await
            .with_context(|| format!("failed to list nodes with label {selector}"))?;
        debug!(selector = %selector, count = nodes.len(), "Listed nodes by label");
        Ok(nodes)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        list_all_paginated(&self.nodes(), ListParams::default())
            .await
            .context("failed to list nodes")
    }

    async fn list_node_claims(&self) -> Result<Vec<NodeClaim>> {
        list_all_paginated(&self.node_claims(), ListParams::default())
            .await
            .context("failed to list nodeclaims")
    }

    async fn delete_node(&self, name: &str) -> Result<()> {
        let api = self.nodes();
        let result = retry_api_call(
            || async {
                match api.delete(name, &DeleteParams::default()).await {
                    Ok(_) => Ok(()),
                    Err(e) if is_not_found(&e) => {
                        debug!(node = %name, "Node already deleted");
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            },
            "delete node",
        )
        .await;

        result.with_context(|| format!("failed to delete node {name}"))?;
        info!(node = %name, "Deleted node");
        Ok(())
    }

    async fn patch_node_claim_conditions(
        &self,
        name: &str,
        resource_version: Option<&str>,
        conditions: &[Condition],
    ) -> Result<()> {
        let api = self.node_claims();
        let mut patch = json!({ "status": { "conditions": conditions } });
        if let Some(version) = resource_version {
            patch["metadata"] = json!({ "resourceVersion": version });
        }

        retry_api_call(
            || async {
                api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await
            },
            "patch nodeclaim status",
        )
        .await
        .with_context(|| format!("failed to patch status of nodeclaim {name}"))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod cluster_tests;
