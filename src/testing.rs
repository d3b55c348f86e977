// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory stand-ins for the cloud and the cluster, shared by unit tests.
//!
//! Both fakes record every call so tests can assert on what was (or was not)
//! sent, and both can be programmed with errors to exercise failure paths.

use crate::cloud::types::AgentPoolProperties;
use crate::cloud::{AgentPool, AgentPoolClient, CloudError};
use crate::cluster::ClusterClient;
use crate::crd::{
    Condition, NodeClaim, NodeClaimResources, NodeClaimSpec, NodeClaimStatus,
    NodeSelectorRequirementWithMinValues, OPERATOR_IN, RESOURCE_STORAGE,
};
use crate::labels::{
    AGENT_POOL_LABEL, CREATION_TIMESTAMP_FORMAT, CREATION_TIMESTAMP_LABEL, INSTANCE_TYPE_LABEL,
    NODE_POOL_LABEL, NODE_POOL_LABEL_VALUE, WORKSPACE_LABEL,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Node, NodeCondition, NodeSpec, NodeStatus};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::ObjectMeta;
use reqwest::StatusCode;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scale set VM provider ID for a pool, as the managed service assigns it.
pub fn scale_set_provider_id(pool: &str) -> String {
    format!(
        "azure:///subscriptions/sub/resourceGroups/mc_rg_cluster_eastus/providers/Microsoft.Compute/virtualMachineScaleSets/aks-{pool}-12345678-vmss/virtualMachines/0"
    )
}

/// A not-found error as ARM returns it.
pub fn cloud_not_found(operation: &'static str) -> CloudError {
    CloudError::Api {
        operation,
        status: StatusCode::NOT_FOUND,
        code: "NotFound".to_string(),
        message: "agent pool not found".to_string(),
    }
}

/// A generic server error.
pub fn cloud_server_error(operation: &'static str) -> CloudError {
    CloudError::Api {
        operation,
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "InternalServerError".to_string(),
        message: "boom".to_string(),
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Agent pool carrying both ownership markers and a creation timestamp.
pub fn owned_pool(name: &str, vm_size: &str, created_at: DateTime<Utc>) -> AgentPool {
    let labels = BTreeMap::from([
        (WORKSPACE_LABEL.to_string(), "falcon".to_string()),
        (NODE_POOL_LABEL.to_string(), NODE_POOL_LABEL_VALUE.to_string()),
        (
            CREATION_TIMESTAMP_LABEL.to_string(),
            created_at.format(CREATION_TIMESTAMP_FORMAT).to_string(),
        ),
    ]);
    pool_with_labels(name, vm_size, labels)
}

/// Agent pool with exactly the given node labels.
pub fn pool_with_labels(name: &str, vm_size: &str, labels: BTreeMap<String, String>) -> AgentPool {
    AgentPool {
        id: Some(format!("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.ContainerService/managedClusters/cluster/agentPools/{name}")),
        name: Some(name.to_string()),
        properties: AgentPoolProperties {
            count: Some(1),
            vm_size: Some(vm_size.to_string()),
            provisioning_state: Some("Succeeded".to_string()),
            node_labels: Some(labels),
            ..Default::default()
        },
    }
}

/// Node labelled with its agent pool, optionally carrying a provider ID.
pub fn node(name: &str, pool: &str, provider_id: Option<&str>) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(BTreeMap::from([(
                AGENT_POOL_LABEL.to_string(),
                pool.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(NodeSpec {
            provider_id: provider_id.map(str::to_string),
            ..Default::default()
        }),
        status: None,
    }
}

/// Set the Ready condition of a Node.
pub fn with_ready(mut node: Node, status: &str) -> Node {
    node.status = Some(NodeStatus {
        conditions: Some(vec![NodeCondition {
            type_: "Ready".to_string(),
            status: status.to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    });
    node
}

/// `NodeClaim` asking for one VM size and a storage request.
pub fn node_claim(name: &str, instance_type: &str, storage: Option<&str>) -> NodeClaim {
    let requests = storage.map(|value| {
        BTreeMap::from([(RESOURCE_STORAGE.to_string(), Quantity(value.to_string()))])
    });
    let mut claim = NodeClaim::new(
        name,
        NodeClaimSpec {
            requirements: vec![NodeSelectorRequirementWithMinValues {
                key: INSTANCE_TYPE_LABEL.to_string(),
                operator: OPERATOR_IN.to_string(),
                values: vec![instance_type.to_string()],
                min_values: None,
            }],
            resources: NodeClaimResources { requests },
            ..Default::default()
        },
    );
    claim.metadata.labels = Some(BTreeMap::from([
        (WORKSPACE_LABEL.to_string(), "falcon".to_string()),
        (NODE_POOL_LABEL.to_string(), NODE_POOL_LABEL_VALUE.to_string()),
    ]));
    claim
}

/// `NodeClaim` with a provider ID and conditions in its status.
pub fn node_claim_with_status(
    name: &str,
    provider_id: &str,
    conditions: Vec<Condition>,
) -> NodeClaim {
    let mut claim = node_claim(name, "Standard_NC12s_v3", Some("120Gi"));
    claim.status = Some(NodeClaimStatus {
        provider_id: Some(provider_id.to_string()),
        conditions,
        ..Default::default()
    });
    claim
}

// ============================================================================
// Fake agent pool client
// ============================================================================

/// In-memory [`AgentPoolClient`].
///
/// Created pools come back `Succeeded`. Queued errors are returned, one per
/// call, before the in-memory state is consulted.
#[derive(Default)]
pub struct FakeAgentPoolClient {
    pools: Mutex<BTreeMap<String, AgentPool>>,
    calls: Mutex<Vec<String>>,
    create_errors: Mutex<VecDeque<CloudError>>,
    get_errors: Mutex<VecDeque<CloudError>>,
    delete_errors: Mutex<VecDeque<CloudError>>,
    list_errors: Mutex<VecDeque<CloudError>>,
    failing_deletes: Mutex<BTreeSet<String>>,
    delete_delay: Mutex<Option<Duration>>,
    deletes_in_flight: AtomicU32,
    peak_deletes_in_flight: AtomicU32,
}

impl FakeAgentPoolClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, pool: AgentPool) {
        let name = pool.name.clone().unwrap_or_default();
        self.pools.lock().unwrap().insert(name, pool);
    }

    pub fn pool(&self, name: &str) -> Option<AgentPool> {
        self.pools.lock().unwrap().get(name).cloned()
    }

    /// Every call as `operation:name` (`list` has no name).
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next_create(&self, err: CloudError) {
        self.create_errors.lock().unwrap().push_back(err);
    }

    pub fn fail_next_get(&self, err: CloudError) {
        self.get_errors.lock().unwrap().push_back(err);
    }

    pub fn fail_next_delete(&self, err: CloudError) {
        self.delete_errors.lock().unwrap().push_back(err);
    }

    pub fn fail_next_list(&self, err: CloudError) {
        self.list_errors.lock().unwrap().push_back(err);
    }

    /// Make every delete of `name` fail with a server error.
    pub fn fail_deletes_of(&self, name: &str) {
        self.failing_deletes.lock().unwrap().insert(name.to_string());
    }

    /// Make every delete take `delay` before it completes.
    pub fn slow_deletes(&self, delay: Duration) {
        *self.delete_delay.lock().unwrap() = Some(delay);
    }

    /// Most deletes that were running at the same time.
    pub fn peak_concurrent_deletes(&self) -> u32 {
        self.peak_deletes_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn delete_now(&self, name: &str) -> Result<(), CloudError> {
        if let Some(err) = Self::next_error(&self.delete_errors) {
            return Err(err);
        }
        if self.failing_deletes.lock().unwrap().contains(name) {
            return Err(cloud_server_error("delete"));
        }
        match self.pools.lock().unwrap().remove(name) {
            Some(_) => Ok(()),
            None => Err(cloud_not_found("delete")),
        }
    }

    fn next_error(queue: &Mutex<VecDeque<CloudError>>) -> Option<CloudError> {
        queue.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl AgentPoolClient for FakeAgentPoolClient {
    async fn create_or_update(&self, name: &str, pool: &AgentPool) -> Result<AgentPool, CloudError> {
        self.record(format!("create_or_update:{name}"));
        if let Some(err) = Self::next_error(&self.create_errors) {
            return Err(err);
        }

        let mut created = pool.clone();
        created.name = Some(name.to_string());
        created.id = Some(format!("/subscriptions/sub/resourceGroups/rg/providers/Microsoft.ContainerService/managedClusters/cluster/agentPools/{name}"));
        created.properties.provisioning_state = Some("Succeeded".to_string());
        self.insert(created.clone());
        Ok(created)
    }

    async fn get(&self, name: &str) -> Result<AgentPool, CloudError> {
        self.record(format!("get:{name}"));
        if let Some(err) = Self::next_error(&self.get_errors) {
            return Err(err);
        }
        self.pool(name).ok_or_else(|| cloud_not_found("get"))
    }

    async fn delete(&self, name: &str) -> Result<(), CloudError> {
        self.record(format!("delete:{name}"));
        let in_flight = self.deletes_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_deletes_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.delete_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.delete_now(name);

        self.deletes_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn list(&self) -> Result<Vec<AgentPool>, CloudError> {
        self.record("list".to_string());
        if let Some(err) = Self::next_error(&self.list_errors) {
            return Err(err);
        }
        Ok(self.pools.lock().unwrap().values().cloned().collect())
    }
}

// ============================================================================
// Fake cluster client
// ============================================================================

/// In-memory [`ClusterClient`].
#[derive(Default)]
pub struct FakeClusterClient {
    nodes: Mutex<Vec<Node>>,
    delayed_nodes: Mutex<Vec<(u32, Node)>>,
    label_lookups: AtomicU32,
    node_claims: Mutex<Vec<NodeClaim>>,
    deleted_nodes: Mutex<Vec<String>>,
    failing_node_deletes: Mutex<BTreeSet<String>>,
    patched: Mutex<Vec<(String, Vec<Condition>)>>,
    patch_versions: Mutex<Vec<Option<String>>>,
    fail_node_claim_list: Mutex<bool>,
}

impl FakeClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&self, node: Node) {
        self.nodes.lock().unwrap().push(node);
    }

    /// Add a Node that only becomes visible on the `after`-th label lookup.
    pub fn add_node_after_lookups(&self, after: u32, node: Node) {
        self.delayed_nodes.lock().unwrap().push((after, node));
    }

    pub fn add_node_claim(&self, claim: NodeClaim) {
        self.node_claims.lock().unwrap().push(claim);
    }

    pub fn fail_node_claim_list(&self) {
        *self.fail_node_claim_list.lock().unwrap() = true;
    }

    pub fn fail_deletes_of_node(&self, name: &str) {
        self.failing_node_deletes
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    pub fn label_lookups(&self) -> u32 {
        self.label_lookups.load(Ordering::SeqCst)
    }

    pub fn deleted_nodes(&self) -> Vec<String> {
        self.deleted_nodes.lock().unwrap().clone()
    }

    pub fn patched(&self) -> Vec<(String, Vec<Condition>)> {
        self.patched.lock().unwrap().clone()
    }

    /// The `resourceVersion` precondition sent with each status patch.
    pub fn patch_versions(&self) -> Vec<Option<String>> {
        self.patch_versions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn list_nodes_with_label(&self, key: &str, value: &str) -> anyhow::Result<Vec<Node>> {
        let lookup = self.label_lookups.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut delayed = self.delayed_nodes.lock().unwrap();
            let mut nodes = self.nodes.lock().unwrap();
            let (ready, waiting): (Vec<_>, Vec<_>) =
                delayed.drain(..).partition(|(after, _)| *after <= lookup);
            *delayed = waiting;
            nodes.extend(ready.into_iter().map(|(_, node)| node));
        }

        Ok(self
            .nodes
            .lock()
            .unwrap()
            .iter()
            .filter(|node| {
                node.metadata
                    .labels
                    .as_ref()
                    .and_then(|labels| labels.get(key))
                    .is_some_and(|v| v == value)
            })
            .cloned()
            .collect())
    }

    async fn list_nodes(&self) -> anyhow::Result<Vec<Node>> {
        Ok(self.nodes.lock().unwrap().clone())
    }

    async fn list_node_claims(&self) -> anyhow::Result<Vec<NodeClaim>> {
        if *self.fail_node_claim_list.lock().unwrap() {
            anyhow::bail!("nodeclaims is forbidden");
        }
        Ok(self.node_claims.lock().unwrap().clone())
    }

    async fn delete_node(&self, name: &str) -> anyhow::Result<()> {
        if self.failing_node_deletes.lock().unwrap().contains(name) {
            anyhow::bail!("failed to delete node {name}");
        }
        self.nodes
            .lock()
            .unwrap()
            .retain(|node| node.metadata.name.as_deref() != Some(name));
        self.deleted_nodes.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn patch_node_claim_conditions(
        &self,
        name: &str,
        resource_version: Option<&str>,
        conditions: &[Condition],
    ) -> anyhow::Result<()> {
        self.patch_versions
            .lock()
            .unwrap()
            .push(resource_version.map(str::to_string));
        self.patched
            .lock()
            .unwrap()
            .push((name.to_string(), conditions.to_vec()));
        Ok(())
    }
}
