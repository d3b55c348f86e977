// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition types and reasons written to `NodeClaim` resources.
//!
//! Karpenter owns most `NodeClaim` conditions (`Launched`, `Registered`,
//! `Initialized`). The provisioner only writes `NodeReady`, which mirrors the
//! `Ready` condition of the Node backing the claim.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   providerID: azure:///subscriptions/.../virtualMachineScaleSets/aks-gpupool1-12345678-vmss/virtualMachines/0
//!   conditions:
//!     - type: Initialized
//!       status: "True"
//!     - type: NodeReady
//!       status: "True"
//!       reason: KubeletReady
//!       message: "kubelet is posting ready status"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Set by Karpenter once the node is registered and its startup taints are gone.
pub const CONDITION_INITIALIZED: &str = "Initialized";

/// Mirrors the Node `Ready` condition onto the claim.
pub const CONDITION_NODE_READY: &str = "NodeReady";

/// Node condition type reported by the kubelet.
pub const NODE_CONDITION_READY: &str = "Ready";

// ============================================================================
// Condition Status Values
// ============================================================================

/// Condition holds.
pub const CONDITION_STATUS_TRUE: &str = "True";

/// Condition does not hold.
pub const CONDITION_STATUS_FALSE: &str = "False";

/// Condition state cannot be determined.
pub const CONDITION_STATUS_UNKNOWN: &str = "Unknown";

// ============================================================================
// Reasons
// ============================================================================

/// The claim is not initialized yet, so node readiness is not tracked.
pub const REASON_NOT_INITIALIZED: &str = "NotInitialized";

/// The Node has not reported a `Ready` condition.
pub const REASON_NODE_READY_UNKNOWN: &str = "NodeReadyUnknown";

/// The Node reports `Ready` but gave no reason.
pub const REASON_NODE_READY: &str = "NodeReady";

/// The Node reports not ready but gave no reason.
pub const REASON_NODE_NOT_READY: &str = "NodeNotReady";
