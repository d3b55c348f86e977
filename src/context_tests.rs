// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `context.rs`

#[cfg(test)]
mod tests {
    use super::super::{Context, ProviderIdIndex};
    use crate::crd::NodeClaim;
    use crate::testing::{node_claim, node_claim_with_status, FakeClusterClient};
    use kube::runtime::reflector;
    use kube::runtime::watcher::Event;
    use std::sync::Arc;

    async fn context_with(claims: Vec<NodeClaim>) -> Context {
        let (reader, mut writer) = reflector::store::<NodeClaim>();
        let index = ProviderIdIndex::default();
        for claim in claims {
            let event = Event::Apply(claim);
            writer.apply_watcher_event(&event);
            index.apply(&event).await;
        }
        Context::new(Arc::new(FakeClusterClient::new()), reader, index)
    }

    #[tokio::test]
    async fn test_lookup_by_provider_id() {
        let ctx = context_with(vec![
            node_claim_with_status("gpupool1", "azure:///vm/1", Vec::new()),
            node_claim_with_status("gpupool2", "azure:///vm/2", Vec::new()),
            node_claim("pending", "Standard_NC12s_v3", Some("120Gi")),
        ])
        .await;

        let found = ctx.node_claim_for_provider_id("azure:///vm/2").await.unwrap();
        assert_eq!(found.metadata.name.as_deref(), Some("gpupool2"));
        assert!(ctx.node_claim_for_provider_id("azure:///vm/3").await.is_none());
        assert_eq!(ctx.provider_ids.count().await, 2);
    }

    #[tokio::test]
    async fn test_empty_provider_id_matches_nothing() {
        let ctx = context_with(vec![
            node_claim_with_status("gpupool1", "", Vec::new()),
            node_claim("pending", "Standard_NC12s_v3", Some("120Gi")),
        ])
        .await;

        assert!(ctx.node_claim_for_provider_id("").await.is_none());
        assert_eq!(ctx.provider_ids.count().await, 0);
    }

    #[tokio::test]
    async fn test_index_follows_provider_id_changes_and_deletes() {
        let index = ProviderIdIndex::default();
        let before = node_claim_with_status("gpupool1", "azure:///vm/1", Vec::new());
        let after = node_claim_with_status("gpupool1", "azure:///vm/9", Vec::new());

        index.apply(&Event::Apply(before)).await;
        index.apply(&Event::Apply(after.clone())).await;
        assert_eq!(index.name_for("azure:///vm/1").await, None);
        assert_eq!(index.name_for("azure:///vm/9").await.as_deref(), Some("gpupool1"));

        index.apply(&Event::Delete(after)).await;
        assert_eq!(index.name_for("azure:///vm/9").await, None);
        assert_eq!(index.count().await, 0);
    }

    #[tokio::test]
    async fn test_relist_replaces_index() {
        let index = ProviderIdIndex::default();
        index
            .apply(&Event::Apply(node_claim_with_status("gone", "azure:///vm/0", Vec::new())))
            .await;

        index.apply(&Event::Init).await;
        index
            .apply(&Event::InitApply(node_claim_with_status("kept", "azure:///vm/1", Vec::new())))
            .await;
        // Still served from the old index until the relist completes.
        assert_eq!(index.name_for("azure:///vm/0").await.as_deref(), Some("gone"));

        index.apply(&Event::InitDone).await;
        assert_eq!(index.name_for("azure:///vm/0").await, None);
        assert_eq!(index.name_for("azure:///vm/1").await.as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_index_hit_missing_from_store_is_none() {
        let (reader, _writer) = reflector::store::<NodeClaim>();
        let index = ProviderIdIndex::default();
        index
            .apply(&Event::Apply(node_claim_with_status("gpupool1", "azure:///vm/1", Vec::new())))
            .await;
        let ctx = Context::new(Arc::new(FakeClusterClient::new()), reader, index);

        assert!(ctx.node_claim_for_provider_id("azure:///vm/1").await.is_none());
    }
}
