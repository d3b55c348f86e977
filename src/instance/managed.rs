// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Instance provider for managed clusters.
//!
//! Pools live under `Microsoft.ContainerService/managedClusters`. Each node is
//! a scale set VM, so the instance id is the Node's provider ID:
//!
//! ```text
//! azure:///subscriptions/<sub>/resourceGroups/<rg>/providers/Microsoft.Compute/virtualMachineScaleSets/aks-<pool>-<n>-vmss/virtualMachines/<i>
//! ```
//!
//! and the pool name is recovered from the scale set segment.

use super::builder::{build_agent_pool, instance_from_pool};
use super::lifecycle::{node_provider_id, PoolLifecycle};
use super::{Instance, InstanceProvider};
use crate::cloud::{AgentPoolClient, ClusterVariant};
use crate::cluster::ClusterClient;
use crate::crd::NodeClaim;
use crate::errors::ProviderError;
use crate::provider_id::agent_pool_name_from_scale_set_id;
use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::info;

/// [`InstanceProvider`] for managed cluster agent pools.
pub struct ManagedInstanceProvider {
    lifecycle: PoolLifecycle,
}

impl ManagedInstanceProvider {
    #[must_use]
    pub fn new(client: Arc<dyn AgentPoolClient>, cluster: Arc<dyn ClusterClient>) -> Self {
        Self {
            lifecycle: PoolLifecycle::new(ClusterVariant::Managed, client, cluster),
        }
    }
}

#[async_trait]
impl InstanceProvider for ManagedInstanceProvider {
    async fn create(&self, node_claim: &NodeClaim) -> Result<Instance, ProviderError> {
        let name = node_claim.name_any();
        let desired = build_agent_pool(node_claim)?;

        info!(
            node_claim = %name,
            vm_size = ?desired.properties.vm_size,
            "Creating agent pool for NodeClaim"
        );
        let pool = self.lifecycle.create_pool(&name, &desired).await?;
        let node = self.lifecycle.wait_for_node(&name).await?;

        let id = node_provider_id(&node).map(str::to_string);
        self.lifecycle.instance_created();
        info!(node_claim = %name, provider_id = ?id, "Instance ready");
        Ok(instance_from_pool(&pool, id, node.metadata.name.clone()))
    }

    async fn get(&self, id: &str) -> Result<Instance, ProviderError> {
        let name = agent_pool_name_from_scale_set_id(id)?;
        let pool = self.lifecycle.get_pool(&name).await?;
        Ok(instance_from_pool(&pool, Some(id.to_string()), None))
    }

    async fn list(&self) -> Result<Vec<Instance>, ProviderError> {
        self.lifecycle
            .list_instances(|_, node| node_provider_id(node).map(str::to_string))
            .await
    }

    async fn delete(&self, id: &str) -> Result<(), ProviderError> {
        let name = agent_pool_name_from_scale_set_id(id)?;
        self.delete_by_name(&name).await
    }

    async fn delete_by_name(&self, name: &str) -> Result<(), ProviderError> {
        self.lifecycle.delete_pool(name).await
    }
}

#[cfg(test)]
#[path = "managed_tests.rs"]
mod managed_tests;
