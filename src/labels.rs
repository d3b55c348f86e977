// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label and annotation keys shared between agent pools, Nodes and NodeClaims.
//!
//! These keys form the correlation contract between the cloud side and the
//! cluster side. The node bootstrapper applies the agent-pool labels on its own,
//! and garbage collection reads the creation timestamp back from the pool, so
//! every value here must stay bit-exact across releases.

// ============================================================================
// Node Correlation Labels
// ============================================================================

/// Label applied by the node bootstrapper carrying the owning agent pool name
pub const AGENT_POOL_LABEL: &str = "agentpool";

/// Newer bootstrappers also apply the agent pool name under this key
pub const AZURE_AGENT_POOL_LABEL: &str = "kubernetes.azure.com/agentpool";

/// Every label key under which a Node may carry its agent pool name
pub const AGENT_POOL_LABEL_KEYS: [&str; 2] = [AGENT_POOL_LABEL, AZURE_AGENT_POOL_LABEL];

// ============================================================================
// Ownership Labels
// ============================================================================

/// Ownership label set on pools created for a workspace
pub const WORKSPACE_LABEL: &str = "kaito.sh/workspace";

/// Ownership label set on pools created for a RAG engine
pub const RAG_ENGINE_LABEL: &str = "kaito.sh/ragengine";

/// A pool carrying any of these keys is owned by this provisioner
pub const OWNERSHIP_LABEL_KEYS: [&str; 2] = [WORKSPACE_LABEL, RAG_ENGINE_LABEL];

/// Karpenter label naming the NodePool a NodeClaim was created from
pub const NODE_POOL_LABEL: &str = "karpenter.sh/nodepool";

/// Value of [`NODE_POOL_LABEL`] marking pools created from a NodeClaim
pub const NODE_POOL_LABEL_VALUE: &str = "kaito";

// ============================================================================
// Provisioner Labels
// ============================================================================

/// Creation timestamp of the NodeClaim, stamped on the pool for garbage collection
pub const CREATION_TIMESTAMP_LABEL: &str = "kaito.sh/creationtimestamp";

/// Sortable, filesystem-safe layout of [`CREATION_TIMESTAMP_LABEL`] (label values cannot hold `:`)
pub const CREATION_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%SZ";

/// Coarse machine class of the pool (`gpu` or `cpu`)
pub const MACHINE_TYPE_LABEL: &str = "kaito.sh/machine-type";

/// [`MACHINE_TYPE_LABEL`] value for GPU families
pub const MACHINE_TYPE_GPU: &str = "gpu";

/// [`MACHINE_TYPE_LABEL`] value for everything else
pub const MACHINE_TYPE_CPU: &str = "cpu";

// ============================================================================
// NodeClaim Scheduling Keys
// ============================================================================

/// Well-known requirement key carrying the VM size
pub const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";

/// NodeClaim label selecting the OS SKU of the pool
pub const OS_SKU_LABEL: &str = "kubernetes.azure.com/os-sku";

/// Prefix reserved by the managed service; labels under it cannot be set on a pool
pub const RESERVED_LABEL_PREFIX: &str = "kubernetes.azure.com/";
