// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Karpenter `NodeClaim` resource as consumed by the provisioner.
//!
//! The CRD itself is installed and owned by Karpenter. This module only mirrors
//! the subset of the `karpenter.sh/v1` schema the instance provider reads
//! (name, requirements, taints, storage request, labels, creation timestamp) and
//! the status conditions the status controller writes back.
//!
//! # Example
//!
//! ```yaml
//! apiVersion: karpenter.sh/v1
//! kind: NodeClaim
//! metadata:
//!   name: gpupool1
//!   labels:
//!     karpenter.sh/nodepool: kaito
//!     kaito.sh/workspace: falcon-7b
//! spec:
//!   requirements:
//!     - key: node.kubernetes.io/instance-type
//!       operator: In
//!       values: ["Standard_NC12s_v3"]
//!   resources:
//!     requests:
//!       storage: 120Gi
//! ```

use crate::labels::INSTANCE_TYPE_LABEL;
use crate::status_reasons::{CONDITION_INITIALIZED, CONDITION_STATUS_TRUE};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Taint;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource name of the storage request
pub const RESOURCE_STORAGE: &str = "storage";

/// Requirement operator selecting from a list of values
pub const OPERATOR_IN: &str = "In";

/// Condition represents an observation of a resource's current state.
///
/// Shape follows the Karpenter status condition so patches round-trip.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (e.g. `Launched`, `Initialized`, `NodeReady`).
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,

    /// Generation of the resource this condition was computed from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// A scheduling requirement with an optional minimum number of distinct values.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSelectorRequirementWithMinValues {
    /// Label key the requirement applies to.
    pub key: String,

    /// One of In, NotIn, Exists, DoesNotExist, Gt, Lt.
    pub operator: String,

    /// Values for In/NotIn/Gt/Lt.
    #[serde(default)]
    pub values: Vec<String>,

    /// Minimum number of unique values the scheduler must keep flexible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_values: Option<i32>,
}

/// Resource requests of the node being claimed.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
pub struct NodeClaimResources {
    /// Minimum resources the node must provide, keyed by resource name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<BTreeMap<String, Quantity>>,
}

/// Reference to the provider-specific node class.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
pub struct NodeClassReference {
    /// API group of the node class.
    pub group: String,

    /// Kind of the node class.
    pub kind: String,

    /// Name of the node class.
    pub name: String,
}

/// `NodeClaim` is Karpenter's request for exactly one node.
///
/// The provisioner uses its name as the agent pool name, so names must satisfy
/// the cloud pool naming rule (`^[a-z][a-z0-9]{0,11}$`).
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "karpenter.sh",
    version = "v1",
    kind = "NodeClaim",
    plural = "nodeclaims",
    doc = "NodeClaim is the Karpenter request for a single node, backed here by one managed agent pool."
)]
#[kube(status = "NodeClaimStatus")]
#[serde(rename_all = "camelCase")]
pub struct NodeClaimSpec {
    /// Taints applied to the node for its whole lifetime.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,

    /// Taints that are expected to be removed once the node is initialized.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub startup_taints: Vec<Taint>,

    /// Scheduling requirements; the instance-type requirement selects the VM size.
    #[serde(default)]
    pub requirements: Vec<NodeSelectorRequirementWithMinValues>,

    /// Resource requests; `storage` sizes the OS disk.
    #[serde(default)]
    pub resources: NodeClaimResources,

    /// Provider-specific node class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_class_ref: Option<NodeClassReference>,

    /// Duration after which the node is expired and replaced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_after: Option<String>,

    /// Maximum time a node may spend draining.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination_grace_period: Option<String>,
}

/// `NodeClaim` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NodeClaimStatus {
    /// Name of the Node that registered for this claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Provider ID of the backing instance.
    #[serde(rename = "providerID", skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,

    /// Image the node booted from.
    #[serde(rename = "imageID", skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,

    /// Resources the node reports as capacity.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capacity: BTreeMap<String, Quantity>,

    /// Resources the node reports as allocatable.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub allocatable: BTreeMap<String, Quantity>,

    /// Status conditions.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl NodeClaim {
    /// First value of the `In` instance-type requirement, i.e. the VM size to provision.
    #[must_use]
    pub fn instance_type(&self) -> Option<&str> {
        self.spec
            .requirements
            .iter()
            .filter(|req| req.key == INSTANCE_TYPE_LABEL && req.operator == OPERATOR_IN)
            .flat_map(|req| req.values.iter())
            .map(String::as_str)
            .find(|value| !value.is_empty())
    }

    /// The storage request, if any.
    #[must_use]
    pub fn storage_request(&self) -> Option<&Quantity> {
        self.spec
            .resources
            .requests
            .as_ref()
            .and_then(|requests| requests.get(RESOURCE_STORAGE))
    }

    /// Provider ID recorded in status once the instance is launched.
    #[must_use]
    pub fn provider_id(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.provider_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Find a status condition by type.
    #[must_use]
    pub fn condition(&self, condition_type: &str) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|status| status.conditions.iter().find(|c| c.r#type == condition_type))
    }

    /// Whether Karpenter has marked the claim `Initialized=True`.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.condition(CONDITION_INITIALIZED)
            .is_some_and(|c| c.status == CONDITION_STATUS_TRUE)
    }

    /// Creation timestamp from metadata.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.metadata
            .creation_timestamp
            .as_ref()
            .and_then(meta_time_to_utc)
    }
}

/// Convert an apimachinery `Time` into a chrono timestamp.
///
/// Goes through the wire representation (RFC3339) so it does not depend on the
/// time library backing `k8s-openapi`.
#[must_use]
pub fn meta_time_to_utc(time: &Time) -> Option<DateTime<Utc>> {
    let value = serde_json::to_value(time).ok()?;
    let raw = value.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Build an apimachinery `Time` from a chrono timestamp.
#[must_use]
pub fn utc_to_meta_time(time: DateTime<Utc>) -> Option<Time> {
    serde_json::from_value(serde_json::Value::String(
        time.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    ))
    .ok()
}
