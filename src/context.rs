// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `NodeClaim` status controller.
//!
//! The controller is driven by Node events but writes to `NodeClaim`s. Claims
//! are cached in a reflector store, and a [`ProviderIdIndex`] fed from the
//! same watch maps a Node's provider ID to its claim without touching the API
//! server or scanning the store.

use crate::cluster::ClusterClient;
use crate::crd::NodeClaim;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::runtime::watcher::Event;
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// `NodeClaim` names keyed by `status.providerID`.
///
/// A relist (`Init` to `InitDone`) is collected into a fresh index that
/// replaces the live one when complete, so claims deleted while the watch was
/// down drop out.
#[derive(Clone, Default)]
pub struct ProviderIdIndex {
    state: Arc<RwLock<IndexState>>,
}

#[derive(Default)]
struct IndexState {
    live: Entries,
    relist: Option<Entries>,
}

#[derive(Default)]
struct Entries {
    by_provider_id: HashMap<String, String>,
    by_name: HashMap<String, String>,
}

impl Entries {
    fn insert(&mut self, claim: &NodeClaim) {
        let name = claim.name_any();
        self.remove(&name);
        if let Some(provider_id) = claim.provider_id() {
            self.by_provider_id
                .insert(provider_id.to_string(), name.clone());
            self.by_name.insert(name, provider_id.to_string());
        }
    }

    fn remove(&mut self, name: &str) {
        let Some(provider_id) = self.by_name.remove(name) else {
            return;
        };
        if self
            .by_provider_id
            .get(&provider_id)
            .is_some_and(|owner| owner == name)
        {
            self.by_provider_id.remove(&provider_id);
        }
    }
}

impl ProviderIdIndex {
    /// Fold one watch event into the index.
    pub async fn apply(&self, event: &Event<NodeClaim>) {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        match event {
            Event::Apply(claim) => state.live.insert(claim),
            Event::Delete(claim) => state.live.remove(&claim.name_any()),
            Event::Init => state.relist = Some(Entries::default()),
            Event::InitApply(claim) => match state.relist.as_mut() {
                Some(relist) => relist.insert(claim),
                None => state.live.insert(claim),
            },
            Event::InitDone => {
                if let Some(relist) = state.relist.take() {
                    state.live = relist;
                }
            }
        }
    }

    /// Name of the `NodeClaim` whose provider ID is `provider_id`.
    pub async fn name_for(&self, provider_id: &str) -> Option<String> {
        self.state
            .read()
            .await
            .live
            .by_provider_id
            .get(provider_id)
            .cloned()
    }

    /// Number of indexed claims.
    pub async fn count(&self) -> usize {
        self.state.read().await.live.by_provider_id.len()
    }
}

/// Shared context passed to the status controller.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes access for status writes
    pub cluster: Arc<dyn ClusterClient>,

    /// Every `NodeClaim` in the cluster
    pub node_claims: Store<NodeClaim>,

    /// Provider ID to `NodeClaim` name
    pub provider_ids: ProviderIdIndex,
}

impl Context {
    #[must_use]
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        node_claims: Store<NodeClaim>,
        provider_ids: ProviderIdIndex,
    ) -> Self {
        Self {
            cluster,
            node_claims,
            provider_ids,
        }
    }

    /// The `NodeClaim` whose `status.providerID` is `provider_id`.
    pub async fn node_claim_for_provider_id(&self, provider_id: &str) -> Option<Arc<NodeClaim>> {
        if provider_id.is_empty() {
            return None;
        }
        let name = self.provider_ids.name_for(provider_id).await?;
        self.node_claims.get(&ObjectRef::new(&name))
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
