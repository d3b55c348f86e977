// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Garbage collection of agent pools that outlived their `NodeClaim`.
//!
//! A pool leaks when its `NodeClaim` is deleted while the create is still in
//! flight, or when the provisioner crashes between creating the pool and the
//! orchestrator recording it. Every pass:
//!
//! 1. Lists the provisioner's instances, skipping pools already `Deleting`
//! 2. Lists live `NodeClaim`s
//! 3. Treats an instance as leaked when no `NodeClaim` has its name and it was
//!    created more than the grace period ago (the grace period covers the
//!    window between pool create and `NodeClaim` status update)
//! 4. Deletes each leaked pool, then its Node unless already terminating
//!
//! Deletions run concurrently with a fixed bound. One failure does not stop
//! the others; all failures are returned together and the next pass retries.

use crate::cluster::ClusterClient;
use crate::constants::{
    GC_GRACE_PERIOD_SECS, GC_MAX_CONCURRENCY, KIND_AGENT_POOL, KIND_NODE,
    PROVISIONING_STATE_DELETING,
};
use crate::errors::ProviderError;
use crate::instance::lifecycle::node_provider_id;
use crate::instance::{Instance, InstanceProvider};
use crate::metrics::{
    record_error, record_garbage_collected, record_reconciliation_error,
    record_reconciliation_success,
};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use k8s_openapi::api::core::v1::Node;
use kube::ResourceExt;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Controller name used in logs and metrics
pub const CONTROLLER_NAME: &str = "GarbageCollection";

/// Periodic collector of leaked agent pools.
#[derive(Clone)]
pub struct GarbageCollector {
    provider: Arc<dyn InstanceProvider>,
    cluster: Arc<dyn ClusterClient>,
    grace_period: chrono::Duration,
}

impl GarbageCollector {
    #[must_use]
    pub fn new(provider: Arc<dyn InstanceProvider>, cluster: Arc<dyn ClusterClient>) -> Self {
        Self {
            provider,
            cluster,
            grace_period: chrono::Duration::seconds(GC_GRACE_PERIOD_SECS),
        }
    }

    /// Run one collection pass.
    ///
    /// # Errors
    ///
    /// Listing failures abort the pass. Deletion failures are collected into
    /// [`ProviderError::Aggregate`] after every deletion has been attempted.
    pub async fn reconcile(&self) -> Result<(), ProviderError> {
        let instances = match self.provider.list().await {
            Ok(instances) => instances,
            Err(ProviderError::NodeClaimNotFound(_)) => {
                debug!("No provisioner agent pools, nothing to collect");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let node_claims: HashSet<String> = self
            .cluster
            .list_node_claims()
            .await?
            .iter()
            .map(ResourceExt::name_any)
            .collect();

        let leaked = self.leaked_instances(instances, &node_claims, Utc::now());
        if leaked.is_empty() {
            debug!(node_claims = node_claims.len(), "No leaked agent pools");
            return Ok(());
        }

        info!(count = leaked.len(), "Deleting leaked agent pools");
        let nodes = self.cluster.list_nodes().await?;
        let nodes = nodes.as_slice();

        let errors: Vec<ProviderError> = stream::iter(leaked)
            .map(|instance| async move { self.collect(&instance, nodes).await })
            .buffer_unordered(GC_MAX_CONCURRENCY)
            .filter_map(|result| async move { result.err() })
            .collect()
            .await;

        ProviderError::from_batch(errors)
    }

    /// Instances with no `NodeClaim` that are older than the grace period.
    fn leaked_instances(
        &self,
        instances: Vec<Instance>,
        node_claims: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Vec<Instance> {
        instances
            .into_iter()
            .filter(|instance| instance.state != PROVISIONING_STATE_DELETING)
            .filter(|instance| !node_claims.contains(&instance.name))
            .filter(|instance| match instance.created_at {
                Some(created_at) => now - created_at > self.grace_period,
                None => {
                    warn!(
                        agent_pool = %instance.name,
                        "Agent pool has no readable creation timestamp, skipping"
                    );
                    false
                }
            })
            .collect()
    }

    /// Delete one leaked instance and its Node.
    async fn collect(&self, instance: &Instance, nodes: &[Node]) -> Result<(), ProviderError> {
        let result = match &instance.id {
            Some(id) => self.provider.delete(id).await,
            None => self.provider.delete_by_name(&instance.name).await,
        };
        if let Err(e) = result {
            error!(agent_pool = %instance.name, error = %e, "Failed to delete leaked agent pool");
            record_error(KIND_AGENT_POOL, "delete");
            return Err(e);
        }
        record_garbage_collected(KIND_AGENT_POOL);
        info!(agent_pool = %instance.name, "Garbage collected agent pool");

        let Some(node) = find_node(instance, nodes) else {
            return Ok(());
        };
        let node_name = node.name_any();
        if node.metadata.deletion_timestamp.is_some() {
            debug!(node = %node_name, "Node already terminating");
            return Ok(());
        }

        if let Err(e) = self.cluster.delete_node(&node_name).await {
            error!(node = %node_name, error = %e, "Failed to delete node of leaked agent pool");
            record_error(KIND_NODE, "delete");
            return Err(e.into());
        }
        record_garbage_collected(KIND_NODE);
        Ok(())
    }

    /// Run [`reconcile`](Self::reconcile) every `interval`, forever.
    ///
    /// The first pass runs immediately. Failed passes are logged and retried
    /// on the next tick.
    ///
    /// # Errors
    ///
    /// Never returns under normal operation.
    pub async fn run(self, interval: Duration) -> anyhow::Result<()> {
        info!(interval = ?interval, "Starting garbage collection controller");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let started = Instant::now();
            match self.reconcile().await {
                Ok(()) => record_reconciliation_success(CONTROLLER_NAME, started.elapsed()),
                Err(e) => {
                    error!(error = %e, "Garbage collection pass failed");
                    record_reconciliation_error(CONTROLLER_NAME, started.elapsed());
                }
            }
        }
    }
}

/// The Node of an instance, matched by provider ID or, failing that, by name.
fn find_node<'a>(instance: &Instance, nodes: &'a [Node]) -> Option<&'a Node> {
    instance
        .id
        .as_deref()
        .and_then(|id| nodes.iter().find(|node| node_provider_id(node) == Some(id)))
        .or_else(|| {
            let name = instance.node_name.as_deref()?;
            nodes
                .iter()
                .find(|node| node.metadata.name.as_deref() == Some(name))
        })
}

#[cfg(test)]
#[path = "garbage_collection_tests.rs"]
mod garbage_collection_tests;
