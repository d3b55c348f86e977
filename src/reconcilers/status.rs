// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for `NodeClaim` resources.
//!
//! Conditions follow the standard Kubernetes format:
//! - `type`: The aspect of the resource being reported (e.g., "NodeReady")
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status last changed
//!
//! Karpenter writes most `NodeClaim` conditions itself, so every helper here
//! edits one condition in place and leaves the others untouched.
//!
//! # Example
//!
//! ```rust
//! use agentpool_provisioner::reconcilers::status::create_condition;
//!
//! let condition = create_condition("NodeReady", "True", "KubeletReady", "kubelet is posting ready status");
//! assert_eq!(condition.r#type, "NodeReady");
//! ```

use crate::cluster::ClusterClient;
use crate::crd::{Condition, NodeClaim};
use anyhow::Result;
use chrono::Utc;
use kube::ResourceExt;
use tracing::debug;

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// A condition stamped with the current time.
#[must_use]
pub fn create_condition(kind: &str, status: &str, reason: &str, message: &str) -> Condition {
    Condition {
        r#type: kind.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(now()),
        observed_generation: None,
    }
}

/// The condition of type `kind`, if present.
#[must_use]
pub fn find_condition<'a>(conditions: &'a [Condition], kind: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == kind)
}

/// Insert `update`, or overwrite the condition of the same type.
///
/// An overwrite that keeps the status also keeps the existing
/// `lastTransitionTime`; a status change takes the time of `update`.
pub fn upsert_condition(conditions: &mut Vec<Condition>, update: Condition) {
    let Some(existing) = conditions.iter_mut().find(|c| c.r#type == update.r#type) else {
        conditions.push(update);
        return;
    };

    let last_transition_time = if existing.status == update.status {
        existing
            .last_transition_time
            .take()
            .or(update.last_transition_time)
    } else {
        update.last_transition_time
    };
    *existing = Condition {
        last_transition_time,
        observed_generation: existing.observed_generation,
        ..update
    };
}

/// Whether two condition sets say the same thing, ignoring transition times
/// and order.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    fn facts(conditions: &[Condition]) -> Vec<(&str, &str, Option<&str>, Option<&str>)> {
        let mut facts: Vec<_> = conditions
            .iter()
            .map(|c| {
                (
                    c.r#type.as_str(),
                    c.status.as_str(),
                    c.reason.as_deref(),
                    c.message.as_deref(),
                )
            })
            .collect();
        facts.sort_unstable();
        facts
    }
    facts(current) == facts(new)
}

/// Collects condition changes for one `NodeClaim` and writes them in one patch.
///
/// Starts from the claim's current conditions; [`apply`](Self::apply) is a
/// no-op when nothing changed semantically, so status writes do not feed back
/// into another reconciliation.
///
/// The patch carries the `resourceVersion` the conditions were read at. The
/// conditions list is replaced as a whole, so a write based on a stale read is
/// rejected with a conflict instead of reverting newer conditions.
pub struct NodeClaimStatusUpdater {
    name: String,
    resource_version: Option<String>,
    current_conditions: Vec<Condition>,
    new_conditions: Vec<Condition>,
}

impl NodeClaimStatusUpdater {
    /// Start from the current status of `node_claim`.
    #[must_use]
    pub fn new(node_claim: &NodeClaim) -> Self {
        let conditions = node_claim
            .status
            .as_ref()
            .map(|status| status.conditions.clone())
            .unwrap_or_default();
        Self {
            name: node_claim.name_any(),
            resource_version: node_claim.resource_version(),
            current_conditions: conditions.clone(),
            new_conditions: conditions,
        }
    }

    /// Set one condition, keeping its transition time if the status is unchanged.
    pub fn set_condition(&mut self, kind: &str, status: &str, reason: &str, message: &str) {
        upsert_condition(
            &mut self.new_conditions,
            create_condition(kind, status, reason, message),
        );
    }

    /// Whether the collected conditions differ from the ones read.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !conditions_equal(&self.current_conditions, &self.new_conditions)
    }

    /// The conditions that will be written.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.new_conditions
    }

    /// Write the collected conditions, if anything changed.
    ///
    /// Returns whether a patch was sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the Kubernetes API call fails, including a
    /// conflict when the claim changed since it was read.
    pub async fn apply(&self, cluster: &dyn ClusterClient) -> Result<bool> {
        if !self.has_changes() {
            debug!(node_claim = %self.name, "NodeClaim status unchanged, skipping update");
            return Ok(false);
        }

        cluster
            .patch_node_claim_conditions(
                &self.name,
                self.resource_version.as_deref(),
                &self.new_conditions,
            )
            .await?;

        debug!(
            node_claim = %self.name,
            conditions = self.new_conditions.len(),
            "Updated NodeClaim status conditions"
        );
        Ok(true)
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
