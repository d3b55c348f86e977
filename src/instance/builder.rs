// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Translation between `NodeClaim`s, agent pools and [`Instance`]s.
//!
//! Everything here is pure: no cloud or cluster access, so the naming, label,
//! taint and disk sizing rules can be tested in isolation.

use super::Instance;
use crate::cloud::types::AgentPoolProperties;
use crate::cloud::AgentPool;
use crate::constants::{
    AGENT_POOL_MODE_USER, AGENT_POOL_NAME_MAX_LEN, AGENT_POOL_NODE_COUNT, AGENT_POOL_TYPE_VMSS,
    DEFAULT_OS_SKU, GPU_VM_SIZE_MARKER, OS_TYPE_LINUX,
};
use crate::crd::NodeClaim;
use crate::errors::ProviderError;
use crate::labels::{
    CREATION_TIMESTAMP_FORMAT, CREATION_TIMESTAMP_LABEL, MACHINE_TYPE_CPU, MACHINE_TYPE_GPU,
    MACHINE_TYPE_LABEL, NODE_POOL_LABEL, NODE_POOL_LABEL_VALUE, OS_SKU_LABEL,
    RESERVED_LABEL_PREFIX,
};
use crate::quantity::quantity_bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use k8s_openapi::api::core::v1::Taint;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// Check that `name` is usable as an agent pool name: `^[a-z][a-z0-9]{0,11}$`.
///
/// # Errors
///
/// [`ProviderError::InvalidName`] otherwise.
pub fn validate_pool_name(name: &str) -> Result<(), ProviderError> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && name.len() <= AGENT_POOL_NAME_MAX_LEN;

    if valid {
        Ok(())
    } else {
        Err(ProviderError::InvalidName(name.to_string()))
    }
}

/// `gpu` for GPU VM families, `cpu` otherwise.
#[must_use]
pub fn machine_type(vm_size: &str) -> &'static str {
    if vm_size.to_ascii_lowercase().contains(GPU_VM_SIZE_MARKER) {
        MACHINE_TYPE_GPU
    } else {
        MACHINE_TYPE_CPU
    }
}

/// Encode a taint the way the agent pool API expects: `key=value:effect`,
/// or `key:effect` when the taint has no value.
#[must_use]
pub fn encode_taint(taint: &Taint) -> String {
    match taint.value.as_deref().filter(|v| !v.is_empty()) {
        Some(value) => format!("{}={}:{}", taint.key, value, taint.effect),
        None => format!("{}:{}", taint.key, taint.effect),
    }
}

/// OS disk size in whole GiB from the `NodeClaim` storage request.
///
/// Rounds down; a request under 1 GiB gives 0, which the service reads as
/// its default disk size.
///
/// # Errors
///
/// [`ProviderError::InvalidStorage`] when the request is missing, unparsable,
/// not positive, or too large for the API.
pub fn os_disk_size_gb(node_claim: &NodeClaim) -> Result<i32, ProviderError> {
    let invalid = |reason: String| ProviderError::InvalidStorage {
        node_claim: node_claim.name_any(),
        reason,
    };

    let quantity = node_claim
        .storage_request()
        .ok_or_else(|| invalid("storage request is missing".to_string()))?;
    let bytes = quantity_bytes(quantity).map_err(|e| invalid(e.to_string()))?;
    if bytes <= 0 {
        return Err(invalid(format!("storage request {} is not positive", quantity.0)));
    }

    i32::try_from(bytes >> 30).map_err(|_| invalid(format!("storage request {} is too large", quantity.0)))
}

/// Format a creation time as a label value.
#[must_use]
pub fn format_creation_timestamp(time: DateTime<Utc>) -> String {
    time.format(CREATION_TIMESTAMP_FORMAT).to_string()
}

/// Parse a creation timestamp label value.
#[must_use]
pub fn parse_creation_timestamp(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, CREATION_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Build the desired agent pool for `node_claim`.
///
/// # Errors
///
/// Validation errors for the name, instance type or storage request.
pub fn build_agent_pool(node_claim: &NodeClaim) -> Result<AgentPool, ProviderError> {
    let name = node_claim.name_any();
    validate_pool_name(&name)?;

    let vm_size = node_claim
        .instance_type()
        .ok_or_else(|| ProviderError::MissingInstanceType(name.clone()))?
        .to_string();
    let disk_size = os_disk_size_gb(node_claim)?;

    let claim_labels = node_claim.labels();
    let os_sku = claim_labels
        .get(OS_SKU_LABEL)
        .filter(|sku| !sku.is_empty())
        .cloned()
        .unwrap_or_else(|| DEFAULT_OS_SKU.to_string());

    let mut labels: BTreeMap<String, String> = claim_labels
        .iter()
        .filter(|(key, _)| !key.starts_with(RESERVED_LABEL_PREFIX))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    labels.insert(NODE_POOL_LABEL.to_string(), NODE_POOL_LABEL_VALUE.to_string());
    labels.insert(
        MACHINE_TYPE_LABEL.to_string(),
        machine_type(&vm_size).to_string(),
    );
    let created_at = node_claim.created_at().unwrap_or_else(Utc::now);
    labels.insert(
        CREATION_TIMESTAMP_LABEL.to_string(),
        format_creation_timestamp(created_at),
    );

    let taints: Vec<String> = node_claim
        .spec
        .taints
        .iter()
        .chain(node_claim.spec.startup_taints.iter())
        .map(encode_taint)
        .collect();

    Ok(AgentPool {
        id: None,
        name: Some(name),
        properties: AgentPoolProperties {
            count: Some(AGENT_POOL_NODE_COUNT),
            vm_size: Some(vm_size),
            os_disk_size_gb: Some(disk_size),
            os_type: Some(OS_TYPE_LINUX.to_string()),
            os_sku: Some(os_sku),
            mode: Some(AGENT_POOL_MODE_USER.to_string()),
            pool_type: Some(AGENT_POOL_TYPE_VMSS.to_string()),
            node_labels: Some(labels),
            node_taints: (!taints.is_empty()).then_some(taints),
            ..Default::default()
        },
    })
}

/// Convert a pool into an [`Instance`] with the given id and Node name.
#[must_use]
pub fn instance_from_pool(
    pool: &AgentPool,
    id: Option<String>,
    node_name: Option<String>,
) -> Instance {
    let labels = pool.labels();
    let created_at = labels
        .get(CREATION_TIMESTAMP_LABEL)
        .and_then(|value| parse_creation_timestamp(value));

    Instance {
        name: pool.name.clone().unwrap_or_default(),
        id,
        node_name,
        state: pool.provisioning_state().to_string(),
        instance_type: pool.properties.vm_size.clone().unwrap_or_default(),
        image_id: pool.properties.node_image_version.clone(),
        subnet_id: pool.properties.vnet_subnet_id.clone(),
        tags: pool.properties.tags.clone().unwrap_or_default(),
        labels,
        created_at,
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod builder_tests;
