// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource scope of the cluster whose agent pools are managed.
//!
//! Managed clusters keep agent pools under `Microsoft.ContainerService`;
//! connected (hybrid) clusters keep them under the provisioned cluster instance
//! of `Microsoft.HybridContainerService`, nested in the connected cluster.

use crate::constants::{HYBRID_CLUSTER_API_VERSION, MANAGED_CLUSTER_API_VERSION};
use serde::{Deserialize, Serialize};

/// Which container service hosts the agent pools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClusterVariant {
    /// Managed cluster (`Microsoft.ContainerService/managedClusters`)
    #[default]
    Managed,
    /// Connected cluster (`Microsoft.Kubernetes/connectedClusters` + hybrid container service)
    Hybrid,
}

impl ClusterVariant {
    /// API version used for agent pool calls.
    #[must_use]
    pub fn api_version(self) -> &'static str {
        match self {
            Self::Managed => MANAGED_CLUSTER_API_VERSION,
            Self::Hybrid => HYBRID_CLUSTER_API_VERSION,
        }
    }
}

impl std::fmt::Display for ClusterVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Managed => f.write_str("managed"),
            Self::Hybrid => f.write_str("hybrid"),
        }
    }
}

/// Subscription, resource group and cluster the provisioner works in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterScope {
    /// Subscription id
    pub subscription_id: String,
    /// Resource group of the cluster resource
    pub resource_group: String,
    /// Cluster resource name
    pub cluster_name: String,
    /// Hosting service
    pub variant: ClusterVariant,
}

impl ClusterScope {
    /// Resource path of the cluster resource.
    #[must_use]
    pub fn cluster_path(&self) -> String {
        let base = format!(
            "/subscriptions/{}/resourceGroups/{}/providers",
            self.subscription_id, self.resource_group
        );
        match self.variant {
            ClusterVariant::Managed => format!(
                "{base}/Microsoft.ContainerService/managedClusters/{}",
                self.cluster_name
            ),
            ClusterVariant::Hybrid => format!(
                "{base}/Microsoft.Kubernetes/connectedClusters/{}/providers/Microsoft.HybridContainerService/provisionedClusterInstances/default",
                self.cluster_name
            ),
        }
    }

    /// Resource path of the agent pool collection.
    #[must_use]
    pub fn agent_pools_path(&self) -> String {
        format!("{}/agentPools", self.cluster_path())
    }

    /// Resource path of one agent pool.
    #[must_use]
    pub fn agent_pool_path(&self, pool_name: &str) -> String {
        format!("{}/{pool_name}", self.agent_pools_path())
    }
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod scope_tests;
