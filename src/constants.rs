// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the agent pool provisioner.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// Kind name for `NodeClaim` resource
pub const KIND_NODE_CLAIM: &str = "NodeClaim";

/// Kind name for core `Node` resource
pub const KIND_NODE: &str = "Node";

/// Kind name used in metrics for cloud agent pools
pub const KIND_AGENT_POOL: &str = "AgentPool";

// ============================================================================
// Agent Pool Constants
// ============================================================================

/// Maximum length of an agent pool name
pub const AGENT_POOL_NAME_MAX_LEN: usize = 12;

/// Node count requested for every pool; one NodeClaim maps to one node
pub const AGENT_POOL_NODE_COUNT: i32 = 1;

/// Agent pool mode for workload pools
pub const AGENT_POOL_MODE_USER: &str = "User";

/// Agent pool scale-set type
pub const AGENT_POOL_TYPE_VMSS: &str = "VirtualMachineScaleSets";

/// OS type of every pool
pub const OS_TYPE_LINUX: &str = "Linux";

/// OS SKU when the NodeClaim does not ask for one
pub const DEFAULT_OS_SKU: &str = "Ubuntu";

/// Case-insensitive VM size fragment identifying GPU families (NC, ND, NV...)
pub const GPU_VM_SIZE_MARKER: &str = "standard_n";

/// Provisioning state of a pool being torn down
pub const PROVISIONING_STATE_DELETING: &str = "Deleting";

// ============================================================================
// ARM Constants
// ============================================================================

/// Default Azure Resource Manager endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// API version for `Microsoft.ContainerService` agent pools
pub const MANAGED_CLUSTER_API_VERSION: &str = "2024-02-01";

/// API version for `Microsoft.HybridContainerService` agent pools
pub const HYBRID_CLUSTER_API_VERSION: &str = "2024-01-01";

/// Default interval between long-running operation polls (seconds)
pub const LRO_POLL_INTERVAL_SECS: u64 = 5;

/// Upper bound on a single long-running operation (seconds)
pub const LRO_TIMEOUT_SECS: u64 = 1800;

/// HTTP request timeout for a single ARM call (seconds)
pub const ARM_REQUEST_TIMEOUT_SECS: u64 = 60;

// ============================================================================
// Node Resolution Constants
// ============================================================================

/// Attempts made to find the Node of a freshly created pool
pub const NODE_RESOLUTION_STEPS: u32 = 15;

/// Delay between node resolution attempts (milliseconds)
pub const NODE_RESOLUTION_INTERVAL_MILLIS: u64 = 1000;

/// Growth factor between node resolution attempts (linear)
pub const NODE_RESOLUTION_FACTOR: f64 = 1.0;

/// Jitter applied to node resolution delays (±10%)
pub const NODE_RESOLUTION_JITTER: f64 = 0.1;

// ============================================================================
// Garbage Collection Constants
// ============================================================================

/// Interval between garbage collection passes (2 minutes)
pub const GC_INTERVAL_SECS: u64 = 120;

/// Minimum age of an unclaimed pool before it is collected
pub const GC_GRACE_PERIOD_SECS: i64 = 30;

/// Maximum number of concurrent deletions in one pass
pub const GC_MAX_CONCURRENCY: usize = 20;

// ============================================================================
// Controller Constants
// ============================================================================

/// Requeue delay after a failed reconciliation (seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Page size for Kubernetes list calls
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

/// Worker threads for the Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address of the metrics and health server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Metrics endpoint path
pub const METRICS_SERVER_PATH: &str = "/metrics";
