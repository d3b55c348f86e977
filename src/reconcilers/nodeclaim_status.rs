// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `NodeClaim` readiness controller.
//!
//! Karpenter only reports `Initialized` on a `NodeClaim`. This controller
//! watches Nodes and copies each Node's `Ready` condition onto the owning
//! `NodeClaim` as `NodeReady`, so readiness of the backing agent pool is
//! visible on the claim itself.
//!
//! The owning claim is the one whose `status.providerID` equals the Node's
//! `spec.providerID`. Until Karpenter marks the claim `Initialized` the
//! readiness is reported as `Unknown`.

use crate::cluster::ClusterClient;
use crate::constants::{ERROR_REQUEUE_DURATION_SECS, KIND_NODE_CLAIM};
use crate::context::{Context, ProviderIdIndex};
use crate::crd::NodeClaim;
use crate::instance::lifecycle::node_provider_id;
use crate::metrics::{record_error, record_reconciliation_error, record_reconciliation_success};
use crate::reconcilers::status::NodeClaimStatusUpdater;
use crate::status_reasons::{
    CONDITION_NODE_READY, CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE,
    CONDITION_STATUS_UNKNOWN, NODE_CONDITION_READY, REASON_NODE_NOT_READY, REASON_NODE_READY,
    REASON_NODE_READY_UNKNOWN, REASON_NOT_INITIALIZED,
};
use anyhow::Result;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::api::Api;
use kube::runtime::controller::Action;
use kube::runtime::reflector::{self, ObjectRef};
use kube::runtime::watcher::{self, Config as WatcherConfig};
use kube::runtime::{Controller, WatchStreamExt};
use kube::{Client, ResourceExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Controller name used in logs and metrics
pub const CONTROLLER_NAME: &str = "NodeClaimStatus";

/// Reconciliation error wrapper
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ReconcileError(#[from] anyhow::Error);

/// The `NodeReady` condition a claim should carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeReadiness {
    pub status: &'static str,
    pub reason: String,
    pub message: String,
}

/// Derive the `NodeReady` condition of `node_claim` from its Node.
#[must_use]
pub fn node_readiness(node_claim: &NodeClaim, node: &Node) -> NodeReadiness {
    if !node_claim.is_initialized() {
        return NodeReadiness {
            status: CONDITION_STATUS_UNKNOWN,
            reason: REASON_NOT_INITIALIZED.to_string(),
            message: "NodeClaim is not initialized".to_string(),
        };
    }

    let ready = node
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == NODE_CONDITION_READY));

    let Some(ready) = ready else {
        return NodeReadiness {
            status: CONDITION_STATUS_UNKNOWN,
            reason: REASON_NODE_READY_UNKNOWN.to_string(),
            message: "Node has not reported a Ready condition".to_string(),
        };
    };

    let (status, default_reason) = match ready.status.as_str() {
        CONDITION_STATUS_TRUE => (CONDITION_STATUS_TRUE, REASON_NODE_READY),
        CONDITION_STATUS_FALSE => (CONDITION_STATUS_FALSE, REASON_NODE_NOT_READY),
        _ => (CONDITION_STATUS_UNKNOWN, REASON_NODE_READY_UNKNOWN),
    };

    NodeReadiness {
        status,
        reason: ready
            .reason
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| default_reason.to_string()),
        message: ready.message.clone().unwrap_or_default(),
    }
}

/// Update the `NodeReady` condition of the claim that owns `node`.
///
/// Returns whether the claim's status was patched. Nodes without a provider
/// ID, or whose claim is not in the store, are ignored.
///
/// # Errors
///
/// Returns an error if the status patch fails.
pub async fn reconcile_node(node: &Node, ctx: &Context) -> Result<bool> {
    let node_name = node.name_any();
    let Some(provider_id) = node_provider_id(node) else {
        debug!(node = %node_name, "Node has no provider ID yet");
        return Ok(false);
    };
    let Some(node_claim) = ctx.node_claim_for_provider_id(provider_id).await else {
        debug!(node = %node_name, provider_id, "No NodeClaim owns this node");
        return Ok(false);
    };

    let readiness = node_readiness(&node_claim, node);
    let mut updater = NodeClaimStatusUpdater::new(&node_claim);
    updater.set_condition(
        CONDITION_NODE_READY,
        readiness.status,
        &readiness.reason,
        &readiness.message,
    );

    let patched = updater.apply(ctx.cluster.as_ref()).await?;
    if patched {
        info!(
            node = %node_name,
            node_claim = %node_claim.name_any(),
            status = readiness.status,
            reason = %readiness.reason,
            "Updated NodeClaim readiness"
        );
    }
    Ok(patched)
}

async fn reconcile(node: Arc<Node>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    match reconcile_node(&node, &ctx).await {
        Ok(_) => {
            record_reconciliation_success(CONTROLLER_NAME, start.elapsed());
            Ok(Action::await_change())
        }
        Err(e) => {
            record_error(KIND_NODE_CLAIM, "status_patch");
            record_reconciliation_error(CONTROLLER_NAME, start.elapsed());
            Err(e.into())
        }
    }
}

#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy(node: Arc<Node>, err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    error!(
        node = %node.name_any(),
        error = %err,
        "Reconciliation error - will retry in {}s",
        ERROR_REQUEUE_DURATION_SECS
    );
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// Run the controller until the watches end.
///
/// Nodes are the primary resource. `NodeClaim`s are both reflected into the
/// lookup store and provider ID index, and watched so that a claim becoming
/// `Initialized` re-queues its Node.
///
/// # Errors
///
/// Returns an error if the `NodeClaim` store never becomes ready.
pub async fn run(client: Client, cluster: Arc<dyn ClusterClient>) -> Result<()> {
    info!("Starting NodeClaim status controller");

    let node_claims: Api<NodeClaim> = Api::all(client.clone());
    let nodes: Api<Node> = Api::all(client);

    let (store, writer) = reflector::store();
    let provider_ids = ProviderIdIndex::default();
    let index = provider_ids.clone();
    let reflector_task = watcher::watcher(node_claims.clone(), WatcherConfig::default())
        .default_backoff()
        .reflect(writer)
        .for_each(move |event| {
            let index = index.clone();
            async move {
                match event {
                    Ok(event) => index.apply(&event).await,
                    Err(e) => warn!(error = %e, "NodeClaim watch failed, retrying"),
                }
            }
        });

    let ctx = Arc::new(Context::new(cluster, store.clone(), provider_ids.clone()));
    let controller = async move {
        store.wait_until_ready().await?;
        debug!(
            node_claims = store.state().len(),
            indexed = provider_ids.count().await,
            "NodeClaim store ready"
        );

        Controller::new(nodes, WatcherConfig::default())
            .watches(node_claims, WatcherConfig::default(), |claim: NodeClaim| {
                claim
                    .status
                    .and_then(|status| status.node_name)
                    .map(|name| ObjectRef::<Node>::new(&name))
            })
            .run(reconcile, error_policy, ctx)
            .for_each(|_| futures::future::ready(()))
            .await;
        anyhow::Ok(())
    };

    let ((), result) = tokio::join!(reflector_task, controller);
    result
}

#[cfg(test)]
#[path = "nodeclaim_status_tests.rs"]
mod nodeclaim_status_tests;
