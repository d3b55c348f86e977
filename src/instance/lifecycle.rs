// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud and cluster steps shared by both instance provider backends.
//!
//! The backends differ only in how an instance id is built and parsed; pool
//! creation, Node correlation, ownership filtering and idempotent deletion
//! behave the same for both and live here.

use super::builder::instance_from_pool;
use super::Instance;
use crate::cloud::{AgentPool, AgentPoolClient, ClusterVariant};
use crate::cluster::ClusterClient;
use crate::errors::ProviderError;
use crate::labels::{
    AGENT_POOL_LABEL_KEYS, NODE_POOL_LABEL, NODE_POOL_LABEL_VALUE, OWNERSHIP_LABEL_KEYS,
};
use crate::metrics::{record_instance_created, record_instance_deleted, record_node_resolution};
use crate::reconcilers::retry::NODE_RESOLUTION;
use k8s_openapi::api::core::v1::Node;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const OP_CREATE: &str = "create";
const OP_GET: &str = "get";
const OP_LIST: &str = "list";
const OP_DELETE: &str = "delete";

/// Whether a pool was created by this provisioner from a `NodeClaim`.
///
/// Both markers are required: an ownership label and the NodePool label with
/// the provisioner's value.
#[must_use]
pub fn is_provisioner_pool(pool: &AgentPool) -> bool {
    let owned = OWNERSHIP_LABEL_KEYS
        .iter()
        .any(|key| pool.label(key).is_some());
    owned && pool.label(NODE_POOL_LABEL) == Some(NODE_POOL_LABEL_VALUE)
}

/// Provider ID of a Node, if set and non-empty.
#[must_use]
pub fn node_provider_id(node: &Node) -> Option<&str> {
    node.spec
        .as_ref()
        .and_then(|spec| spec.provider_id.as_deref())
        .filter(|id| !id.is_empty())
}

/// Pool and Node operations over the cloud and cluster clients.
///
/// `variant` labels the instance lifecycle metrics.
#[derive(Clone)]
pub struct PoolLifecycle {
    variant: ClusterVariant,
    client: Arc<dyn AgentPoolClient>,
    cluster: Arc<dyn ClusterClient>,
}

impl PoolLifecycle {
    #[must_use]
    pub fn new(
        variant: ClusterVariant,
        client: Arc<dyn AgentPoolClient>,
        cluster: Arc<dyn ClusterClient>,
    ) -> Self {
        Self {
            variant,
            client,
            cluster,
        }
    }

    /// Count an instance that became ready.
    pub fn instance_created(&self) {
        record_instance_created(&self.variant.to_string());
    }

    /// Create `pool` as `name` and return the settled pool.
    ///
    /// If the service reports that a create of this pool is already running
    /// (typically after a restart mid-create), `pool` itself is returned and the
    /// caller carries on waiting for the Node.
    ///
    /// # Errors
    ///
    /// Any other cloud failure.
    pub async fn create_pool(&self, name: &str, pool: &AgentPool) -> Result<AgentPool, ProviderError> {
        match self.client.create_or_update(name, pool).await {
            Ok(created) => {
                info!(agent_pool = %name, state = %created.provisioning_state(), "Agent pool created");
                Ok(created)
            }
            Err(e) if e.is_create_in_progress() => {
                warn!(
                    agent_pool = %name,
                    error = %e,
                    "Agent pool create already in progress, continuing with desired pool"
                );
                Ok(pool.clone())
            }
            Err(e) => Err(ProviderError::cloud(OP_CREATE, name, e)),
        }
    }

    /// Find the single Node of pool `name` that carries a provider ID.
    ///
    /// Nodes are looked up under every agent pool label key. Zero or several
    /// matches, or a match without a provider ID, mean "not ready yet".
    ///
    /// # Errors
    ///
    /// Kubernetes API failures.
    pub async fn resolve_node(&self, name: &str) -> Result<Option<Node>, ProviderError> {
        let mut matches: BTreeMap<String, Node> = BTreeMap::new();
        for key in AGENT_POOL_LABEL_KEYS {
            for node in self.cluster.list_nodes_with_label(key, name).await? {
                let node_name = node.metadata.name.clone().unwrap_or_default();
                matches.entry(node_name).or_insert(node);
            }
        }

        if matches.len() != 1 {
            debug!(agent_pool = %name, nodes = matches.len(), "Agent pool does not map to exactly one node");
            return Ok(None);
        }

        Ok(matches
            .into_values()
            .next()
            .filter(|node| node_provider_id(node).is_some()))
    }

    /// Wait for [`resolve_node`](Self::resolve_node) to find the Node of pool `name`.
    ///
    /// Lookups are spaced by the node resolution backoff. Lookup failures are
    /// logged and count as an attempt.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NodeNotReady`] once the attempts run out.
    pub async fn wait_for_node(&self, name: &str) -> Result<Node, ProviderError> {
        let started = Instant::now();
        let mut backoff = NODE_RESOLUTION.start();
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.resolve_node(name).await {
                Ok(Some(node)) => {
                    record_node_resolution("resolved", started.elapsed());
                    debug!(agent_pool = %name, attempts, "Resolved node for agent pool");
                    return Ok(node);
                }
                Ok(None) => {}
                Err(e) => warn!(agent_pool = %name, error = %e, "Node lookup failed"),
            }

            match backoff.next() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => {
                    record_node_resolution("timeout", started.elapsed());
                    return Err(ProviderError::NodeNotReady {
                        agent_pool: name.to_string(),
                        attempts,
                    });
                }
            }
        }
    }

    /// Read pool `name`.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NodeClaimNotFound`] if it does not exist.
    pub async fn get_pool(&self, name: &str) -> Result<AgentPool, ProviderError> {
        self.client.get(name).await.map_err(|e| {
            if e.is_not_found() {
                ProviderError::NodeClaimNotFound(name.to_string())
            } else {
                ProviderError::cloud(OP_GET, name, e)
            }
        })
    }

    /// Every pool created by this provisioner.
    ///
    /// # Errors
    ///
    /// Cloud failures.
    pub async fn provisioner_pools(&self) -> Result<Vec<AgentPool>, ProviderError> {
        let pools = self
            .client
            .list()
            .await
            .map_err(|e| ProviderError::cloud(OP_LIST, "", e))?;
        let total = pools.len();
        let owned: Vec<AgentPool> = pools.into_iter().filter(is_provisioner_pool).collect();
        debug!(total, owned = owned.len(), "Listed agent pools");
        Ok(owned)
    }

    /// Every provisioner pool as an [`Instance`].
    ///
    /// Pools whose Node resolves get the id `instance_id` builds from the pool
    /// name and that Node; the others come back without an id.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NodeClaimNotFound`] when the provisioner owns no pools,
    /// otherwise cloud and Kubernetes failures.
    pub async fn list_instances<F>(&self, instance_id: F) -> Result<Vec<Instance>, ProviderError>
    where
        F: Fn(&str, &Node) -> Option<String> + Send + Sync,
    {
        let pools = self.provisioner_pools().await?;
        if pools.is_empty() {
            return Err(ProviderError::NodeClaimNotFound(
                "no agent pools created by the provisioner".to_string(),
            ));
        }

        let mut instances = Vec::with_capacity(pools.len());
        for pool in &pools {
            let name = pool.name.clone().unwrap_or_default();
            let instance = match self.resolve_node(&name).await? {
                Some(node) => {
                    let id = instance_id(&name, &node);
                    instance_from_pool(pool, id, node.metadata.name)
                }
                None => instance_from_pool(pool, None, None),
            };
            instances.push(instance);
        }
        debug!(count = instances.len(), variant = %self.variant, "Listed instances");
        Ok(instances)
    }

    /// Delete pool `name`; a pool that is already gone is success.
    ///
    /// # Errors
    ///
    /// Cloud failures other than not-found.
    pub async fn delete_pool(&self, name: &str) -> Result<(), ProviderError> {
        match self.client.delete(name).await {
            Ok(()) => info!(agent_pool = %name, "Agent pool deleted"),
            Err(e) if e.is_not_found() => {
                debug!(agent_pool = %name, "Agent pool already deleted");
            }
            Err(e) => return Err(ProviderError::cloud(OP_DELETE, name, e)),
        }
        record_instance_deleted(&self.variant.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod lifecycle_tests;
