// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Instance provider for connected (hybrid) clusters.
//!
//! Pools live under the provisioned cluster instance of a connected cluster.
//! Node provider IDs there do not name the pool, so the instance id is built
//! from the pool resource path instead:
//!
//! ```text
//! azure:///subscriptions/<sub>/resourceGroups/<rg>/providers/Microsoft.Kubernetes/connectedClusters/<cluster>/providers/Microsoft.HybridContainerService/provisionedClusterInstances/default/agentPools/<pool>
//! ```
//!
//! The id is still only handed out once the pool's Node has registered.

use super::builder::{build_agent_pool, instance_from_pool};
use super::lifecycle::PoolLifecycle;
use super::{Instance, InstanceProvider};
use crate::cloud::{AgentPoolClient, ClusterScope, ClusterVariant};
use crate::cluster::ClusterClient;
use crate::crd::NodeClaim;
use crate::errors::ProviderError;
use crate::provider_id::{agent_pool_name_from_connected_pool_id, provider_id_for_resource};
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::info;

/// [`InstanceProvider`] for connected cluster agent pools.
pub struct HybridInstanceProvider {
    scope: ClusterScope,
    lifecycle: PoolLifecycle,
}

impl HybridInstanceProvider {
    #[must_use]
    pub fn new(
        scope: ClusterScope,
        client: Arc<dyn AgentPoolClient>,
        cluster: Arc<dyn ClusterClient>,
    ) -> Self {
        Self {
            scope,
            lifecycle: PoolLifecycle::new(ClusterVariant::Hybrid, client, cluster),
        }
    }

    /// Instance id of pool `name`.
    fn instance_id(&self, name: &str) -> String {
        provider_id_for_resource(&self.scope.agent_pool_path(name))
    }
}

#[async_trait]
impl InstanceProvider for HybridInstanceProvider {
    async fn create(&self, node_claim: &NodeClaim) -> Result<Instance, ProviderError> {
        let name = node_claim.name_any();
        let desired = build_agent_pool(node_claim)?;

        info!(
            node_claim = %name,
            vm_size = ?desired.properties.vm_size,
            cluster = %self.scope.cluster_name,
            "Creating connected cluster agent pool for NodeClaim"
        );
        let pool = self.lifecycle.create_pool(&name, &desired).await?;
        let node = self.lifecycle.wait_for_node(&name).await?;

        let id = self.instance_id(&name);
        self.lifecycle.instance_created();
        info!(node_claim = %name, instance_id = %id, "Instance ready");
        Ok(instance_from_pool(&pool, Some(id), node.metadata.name.clone()))
    }

    async fn get(&self, id: &str) -> Result<Instance, ProviderError> {
        let name = agent_pool_name_from_connected_pool_id(id)?;
        let pool = self.lifecycle.get_pool(&name).await?;
        Ok(instance_from_pool(&pool, Some(id.to_string()), None))
    }

    async fn list(&self) -> Result<Vec<Instance>, ProviderError> {
        self.lifecycle
            .list_instances(|name, _| Some(self.instance_id(name)))
            .await
    }

    async fn delete(&self, id: &str) -> Result<(), ProviderError> {
        let name = agent_pool_name_from_connected_pool_id(id)?;
        self.delete_by_name(&name).await
    }

    async fn delete_by_name(&self, name: &str) -> Result<(), ProviderError> {
        self.lifecycle.delete_pool(name).await
    }
}

#[cfg(test)]
#[path = "hybrid_tests.rs"]
mod hybrid_tests;
