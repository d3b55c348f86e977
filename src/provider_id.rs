// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Provider ID parsing.
//!
//! Kubernetes Nodes carry a `spec.providerID` that embeds the cloud resource
//! path of the machine behind them. The instance provider uses it as the opaque
//! instance id and has to recover the agent pool name from it for `get` and
//! `delete`. Two layouts exist:
//!
//! - **Scale-set VM** (managed clusters):
//!   `azure:///subscriptions/<sub>/resourceGroups/<rg>/providers/Microsoft.Compute/virtualMachineScaleSets/aks-<pool>-<id>-vmss/virtualMachines/<n>`
//! - **Agent pool** (connected clusters):
//!   `azure:///subscriptions/<sub>/resourceGroups/<rg>/providers/Microsoft.Kubernetes/connectedClusters/<cluster>/providers/Microsoft.HybridContainerService/provisionedClusterInstances/default/agentPools/<pool>`
//!
//! Parsing is fixed-structure: literal segments are compared case-insensitively
//! (ARM paths are case-insensitive), variable segments must be non-empty, and
//! anything else is a hard error.

use thiserror::Error;

/// Scheme prefix of every Azure provider ID
pub const AZURE_PROVIDER_PREFIX: &str = "azure://";

/// Prefix of scale sets created for agent pools
const VMSS_NAME_PREFIX: &str = "aks";

/// Suffix of scale sets created for agent pools
const VMSS_NAME_SUFFIX: &str = "vmss";

/// Errors returned when a provider ID does not match the expected layout.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderIdError {
    /// The ID does not have the expected segment structure.
    #[error("provider ID '{id}' is not a valid {layout} provider ID")]
    Malformed {
        /// The offending provider ID
        id: String,
        /// Which layout was expected
        layout: &'static str,
    },

    /// The scale set segment does not follow `aks-<pool>-<id>-vmss`.
    #[error("scale set '{scale_set}' in provider ID '{id}' does not follow aks-<pool>-<id>-vmss")]
    UnexpectedScaleSetName {
        /// The offending provider ID
        id: String,
        /// The scale set name found in the ID
        scale_set: String,
    },
}

/// One segment of a fixed-structure resource path.
#[derive(Debug, Clone, Copy)]
enum Segment {
    /// Must equal this text, ignoring ASCII case
    Literal(&'static str),
    /// Any non-empty text, captured
    Capture,
}

use Segment::{Capture, Literal};

/// Layout of a scale-set VM provider ID (after the scheme).
const SCALE_SET_VM_LAYOUT: [Segment; 10] = [
    Literal("subscriptions"),
    Capture,
    Literal("resourceGroups"),
    Capture,
    Literal("providers"),
    Literal("Microsoft.Compute"),
    Literal("virtualMachineScaleSets"),
    Capture,
    Literal("virtualMachines"),
    Capture,
];

/// Layout of a connected-cluster agent pool provider ID (after the scheme).
const CONNECTED_POOL_LAYOUT: [Segment; 14] = [
    Literal("subscriptions"),
    Capture,
    Literal("resourceGroups"),
    Capture,
    Literal("providers"),
    Literal("Microsoft.Kubernetes"),
    Literal("connectedClusters"),
    Capture,
    Literal("providers"),
    Literal("Microsoft.HybridContainerService"),
    Literal("provisionedClusterInstances"),
    Literal("default"),
    Literal("agentPools"),
    Capture,
];

/// Match `id` against a layout, returning the captured segments in order.
fn match_layout<'a>(id: &'a str, layout: &[Segment]) -> Option<Vec<&'a str>> {
    let prefix = id.get(..AZURE_PROVIDER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(AZURE_PROVIDER_PREFIX) {
        return None;
    }
    let path = id[AZURE_PROVIDER_PREFIX.len()..].strip_prefix('/')?;

    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() != layout.len() {
        return None;
    }

    let mut captures = Vec::new();
    for (segment, expected) in segments.iter().zip(layout) {
        match expected {
            Literal(text) if segment.eq_ignore_ascii_case(text) => {}
            Capture if !segment.is_empty() => captures.push(*segment),
            _ => return None,
        }
    }
    Some(captures)
}

/// Parts of a scale-set VM provider ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleSetVmId {
    /// Subscription id
    pub subscription_id: String,
    /// Node resource group
    pub resource_group: String,
    /// Scale set name (`aks-<pool>-<id>-vmss`)
    pub scale_set: String,
    /// Instance index inside the scale set
    pub instance: String,
}

/// Parse a scale-set VM provider ID.
///
/// # Errors
///
/// Returns [`ProviderIdError::Malformed`] if the ID does not match the layout.
pub fn parse_scale_set_vm_id(id: &str) -> Result<ScaleSetVmId, ProviderIdError> {
    let captures = match_layout(id, &SCALE_SET_VM_LAYOUT).ok_or_else(|| {
        ProviderIdError::Malformed {
            id: id.to_string(),
            layout: "scale-set VM",
        }
    })?;

    Ok(ScaleSetVmId {
        subscription_id: captures[0].to_string(),
        resource_group: captures[1].to_string(),
        scale_set: captures[2].to_string(),
        instance: captures[3].to_string(),
    })
}

/// Recover the agent pool name from a scale-set VM provider ID.
///
/// # Example
///
/// ```rust
/// use agentpool_provisioner::provider_id::agent_pool_name_from_scale_set_id;
///
/// let id = "azure:///subscriptions/sub/resourceGroups/mc_rg/providers/Microsoft.Compute/virtualMachineScaleSets/aks-gpupool1-12345678-vmss/virtualMachines/0";
/// assert_eq!(agent_pool_name_from_scale_set_id(id).unwrap(), "gpupool1");
/// ```
///
/// # Errors
///
/// Returns an error if the ID is malformed or the scale set name does not
/// follow the `aks-<pool>-<id>-vmss` convention.
pub fn agent_pool_name_from_scale_set_id(id: &str) -> Result<String, ProviderIdError> {
    let parsed = parse_scale_set_vm_id(id)?;
    let parts: Vec<&str> = parsed.scale_set.split('-').collect();

    match parts.as_slice() {
        [prefix, pool, _, suffix]
            if prefix.eq_ignore_ascii_case(VMSS_NAME_PREFIX)
                && suffix.eq_ignore_ascii_case(VMSS_NAME_SUFFIX)
                && !pool.is_empty() =>
        {
            Ok((*pool).to_string())
        }
        _ => Err(ProviderIdError::UnexpectedScaleSetName {
            id: id.to_string(),
            scale_set: parsed.scale_set,
        }),
    }
}

/// Recover the agent pool name from a connected-cluster agent pool provider ID.
///
/// # Errors
///
/// Returns [`ProviderIdError::Malformed`] if the ID does not match the layout.
pub fn agent_pool_name_from_connected_pool_id(id: &str) -> Result<String, ProviderIdError> {
    let captures = match_layout(id, &CONNECTED_POOL_LAYOUT).ok_or_else(|| {
        ProviderIdError::Malformed {
            id: id.to_string(),
            layout: "connected-cluster agent pool",
        }
    })?;
    Ok(captures[3].to_string())
}

/// Provider ID for an ARM resource path (`/subscriptions/...`).
#[must_use]
pub fn provider_id_for_resource(resource_path: &str) -> String {
    format!("{AZURE_PROVIDER_PREFIX}{resource_path}")
}
