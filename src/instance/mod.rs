// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Instance provider: one `NodeClaim` backed by one agent pool.
//!
//! The provider creates, reads, lists and deletes agent pools on behalf of
//! `NodeClaim`s and correlates each pool with the Node that joins the cluster
//! from it. Two backends share the [`InstanceProvider`] contract:
//!
//! - [`managed::ManagedInstanceProvider`] for managed clusters, where the
//!   instance id is the scale set VM provider ID reported by the Node
//! - [`hybrid::HybridInstanceProvider`] for connected clusters, where the
//!   instance id is built from the agent pool resource path
//!
//! The backend is chosen once at startup by [`new_instance_provider`].
//!
//! # Modules
//!
//! - [`builder`] - `NodeClaim` to agent pool translation and back
//! - [`lifecycle`] - Cloud and cluster steps both backends share
//! - [`managed`] - Managed cluster backend
//! - [`hybrid`] - Connected cluster backend

pub mod builder;
pub mod hybrid;
pub mod lifecycle;
pub mod managed;

use crate::cloud::{AgentPoolClient, ClusterScope, ClusterVariant};
use crate::cluster::ClusterClient;
use crate::crd::NodeClaim;
use crate::errors::ProviderError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

/// An agent pool as seen by the orchestrator.
///
/// Derived from the pool (and its Node) on every call; never persisted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Instance {
    /// Agent pool name, equal to the `NodeClaim` name
    pub name: String,
    /// Provider ID, known once a Node has been resolved for the pool
    pub id: Option<String>,
    /// Name of the resolved Node
    pub node_name: Option<String>,
    /// Provisioning state of the pool
    pub state: String,
    /// VM size
    pub instance_type: String,
    /// Node image version
    pub image_id: Option<String>,
    /// Subnet the nodes join
    pub subnet_id: Option<String>,
    /// Pool resource tags
    pub tags: BTreeMap<String, String>,
    /// Node labels of the pool
    pub labels: BTreeMap<String, String>,
    /// Creation time of the `NodeClaim`, read back from the pool label
    pub created_at: Option<DateTime<Utc>>,
}

/// Lifecycle of the cloud instance behind a `NodeClaim`.
#[async_trait]
pub trait InstanceProvider: Send + Sync {
    /// Create the agent pool for `node_claim` and wait for its Node.
    ///
    /// # Errors
    ///
    /// Validation errors are returned before any cloud call. Cloud failures
    /// and a Node that never shows up are returned as-is.
    async fn create(&self, node_claim: &NodeClaim) -> Result<Instance, ProviderError>;

    /// Read the instance with provider ID `id`.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NodeClaimNotFound`] if the pool is gone.
    async fn get(&self, id: &str) -> Result<Instance, ProviderError>;

    /// Every instance created by this provisioner.
    ///
    /// # Errors
    ///
    /// [`ProviderError::NodeClaimNotFound`] if none exist.
    async fn list(&self) -> Result<Vec<Instance>, ProviderError>;

    /// Delete the instance with provider ID `id`. A missing pool is success.
    ///
    /// # Errors
    ///
    /// Malformed IDs and cloud failures other than not-found.
    async fn delete(&self, id: &str) -> Result<(), ProviderError>;

    /// Delete an instance whose Node never registered, by pool name.
    ///
    /// # Errors
    ///
    /// Cloud failures other than not-found.
    async fn delete_by_name(&self, name: &str) -> Result<(), ProviderError>;
}

/// Build the backend matching `scope.variant`.
#[must_use]
pub fn new_instance_provider(
    scope: ClusterScope,
    client: Arc<dyn AgentPoolClient>,
    cluster: Arc<dyn ClusterClient>,
) -> Arc<dyn InstanceProvider> {
    match scope.variant {
        ClusterVariant::Managed => Arc::new(managed::ManagedInstanceProvider::new(client, cluster)),
        ClusterVariant::Hybrid => {
            Arc::new(hybrid::HybridInstanceProvider::new(scope, client, cluster))
        }
    }
}
