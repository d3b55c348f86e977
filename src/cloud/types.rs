// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wire types of the agent pool resource.
//!
//! Only the fields the provisioner reads or writes are modelled. Unknown fields
//! returned by ARM are ignored on read, and optional fields are omitted on write
//! so a PUT never clears settings it does not own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An agent pool as returned by, and sent to, the container service.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentPool {
    /// Fully qualified ARM resource id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Pool name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Pool properties
    #[serde(default)]
    pub properties: AgentPoolProperties,
}

/// Properties of an agent pool.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolProperties {
    /// Number of nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i32>,

    /// VM size of every node, e.g. `Standard_NC12s_v3`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_size: Option<String>,

    /// OS disk size in GiB
    #[serde(rename = "osDiskSizeGB", skip_serializing_if = "Option::is_none")]
    pub os_disk_size_gb: Option<i32>,

    /// OS type (`Linux`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,

    /// OS SKU (`Ubuntu`, `AzureLinux`...)
    #[serde(rename = "osSKU", skip_serializing_if = "Option::is_none")]
    pub os_sku: Option<String>,

    /// Pool mode (`User` or `System`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    /// Pool type (`VirtualMachineScaleSets`)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub pool_type: Option<String>,

    /// Labels applied to every node of the pool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_labels: Option<BTreeMap<String, String>>,

    /// Taints applied to every node, encoded as `key=value:effect`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_taints: Option<Vec<String>>,

    /// Tags on the pool resource
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,

    /// Provisioning state, read-only
    #[serde(skip_serializing)]
    pub provisioning_state: Option<String>,

    /// Node image version, read-only
    #[serde(skip_serializing)]
    pub node_image_version: Option<String>,

    /// Subnet the nodes join
    #[serde(rename = "vnetSubnetID", skip_serializing_if = "Option::is_none")]
    pub vnet_subnet_id: Option<String>,
}

impl AgentPool {
    /// Node labels, empty when unset.
    #[must_use]
    pub fn labels(&self) -> BTreeMap<String, String> {
        self.properties.node_labels.clone().unwrap_or_default()
    }

    /// Value of one node label.
    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.properties
            .node_labels
            .as_ref()
            .and_then(|labels| labels.get(key))
            .map(String::as_str)
    }

    /// Provisioning state, empty when unset.
    #[must_use]
    pub fn provisioning_state(&self) -> &str {
        self.properties.provisioning_state.as_deref().unwrap_or_default()
    }
}

/// One page of a list response.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPoolListResult {
    /// Pools in this page
    #[serde(default)]
    pub value: Vec<AgentPool>,

    /// URL of the next page, if any
    #[serde(default)]
    pub next_link: Option<String>,
}

/// ARM error envelope (`{"error": {...}}`).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ArmErrorResponse {
    /// Error details
    pub error: Option<ArmErrorDetail>,
}

/// ARM error details.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ArmErrorDetail {
    /// Machine-readable error code
    #[serde(default)]
    pub code: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

/// Body of an `Azure-AsyncOperation` status document.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OperationStatus {
    /// `InProgress`, `Succeeded`, `Failed` or `Canceled`
    #[serde(default)]
    pub status: String,

    /// Failure details when the operation did not succeed
    #[serde(default)]
    pub error: Option<ArmErrorDetail>,
}
