// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use crate::crd::Condition;
    use crate::reconcilers::status::{
        conditions_equal, create_condition, find_condition, upsert_condition,
        NodeClaimStatusUpdater,
    };
    use crate::testing::{node_claim, node_claim_with_status, FakeClusterClient};

    const CONDITION_TYPE_READY: &str = "NodeReady";
    const STATUS_TRUE: &str = "True";
    const STATUS_FALSE: &str = "False";
    const REASON_READY: &str = "KubeletReady";
    const MESSAGE_READY: &str = "kubelet is posting ready status";

    fn stamped(condition_type: &str, status: &str, time: &str) -> Condition {
        Condition {
            last_transition_time: Some(time.to_string()),
            ..create_condition(condition_type, status, REASON_READY, MESSAGE_READY)
        }
    }

    #[test]
    fn test_create_condition_basic() {
        let condition = create_condition(
            CONDITION_TYPE_READY,
            STATUS_TRUE,
            REASON_READY,
            MESSAGE_READY,
        );

        assert_eq!(condition.r#type, CONDITION_TYPE_READY);
        assert_eq!(condition.status, STATUS_TRUE);
        assert_eq!(condition.reason, Some(REASON_READY.to_string()));
        assert_eq!(condition.message, Some(MESSAGE_READY.to_string()));
        assert!(condition.last_transition_time.is_some());
    }

    #[test]
    fn test_find_condition() {
        let conditions = vec![
            create_condition("Initialized", STATUS_TRUE, "Initialized", ""),
            create_condition(CONDITION_TYPE_READY, STATUS_FALSE, "KubeletNotReady", ""),
        ];

        let found = find_condition(&conditions, CONDITION_TYPE_READY).unwrap();
        assert_eq!(found.status, STATUS_FALSE);
        assert!(find_condition(&conditions, "Launched").is_none());
    }

    #[test]
    fn test_update_keeps_transition_time_when_status_unchanged() {
        let mut conditions = vec![stamped(
            CONDITION_TYPE_READY,
            STATUS_TRUE,
            "2025-01-01T00:00:00+00:00",
        )];

        upsert_condition(
            &mut conditions,
            create_condition(CONDITION_TYPE_READY, STATUS_TRUE, REASON_READY, "still ready"),
        );

        assert_eq!(conditions.len(), 1);
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
        assert_eq!(conditions[0].message.as_deref(), Some("still ready"));
    }

    #[test]
    fn test_update_resets_transition_time_on_status_change() {
        let mut conditions = vec![stamped(
            CONDITION_TYPE_READY,
            STATUS_TRUE,
            "2025-01-01T00:00:00+00:00",
        )];

        upsert_condition(
            &mut conditions,
            create_condition(CONDITION_TYPE_READY, STATUS_FALSE, "KubeletNotReady", ""),
        );

        assert_eq!(conditions[0].status, STATUS_FALSE);
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_update_appends_new_condition_type() {
        let mut conditions = vec![create_condition("Initialized", STATUS_TRUE, "Initialized", "")];

        upsert_condition(
            &mut conditions,
            create_condition(CONDITION_TYPE_READY, STATUS_TRUE, REASON_READY, MESSAGE_READY),
        );

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].r#type, "Initialized");
        assert_eq!(conditions[1].r#type, CONDITION_TYPE_READY);
    }

    #[test]
    fn test_conditions_equal_ignores_transition_time() {
        let a = vec![stamped(CONDITION_TYPE_READY, STATUS_TRUE, "2025-01-01T00:00:00+00:00")];
        let b = vec![stamped(CONDITION_TYPE_READY, STATUS_TRUE, "2025-06-01T00:00:00+00:00")];
        let c = vec![stamped(CONDITION_TYPE_READY, STATUS_FALSE, "2025-01-01T00:00:00+00:00")];

        assert!(conditions_equal(&a, &b));
        assert!(!conditions_equal(&a, &c));
        assert!(!conditions_equal(&a, &[]));

        let initialized = stamped("Initialized", STATUS_TRUE, "2025-01-01T00:00:00+00:00");
        let forward = vec![a[0].clone(), initialized.clone()];
        let reversed = vec![initialized, a[0].clone()];
        assert!(conditions_equal(&forward, &reversed));
    }

    #[tokio::test]
    async fn test_updater_without_changes_does_not_patch() {
        let claim = node_claim_with_status(
            "gpupool1",
            "azure:///vm/0",
            vec![create_condition(
                CONDITION_TYPE_READY,
                STATUS_TRUE,
                REASON_READY,
                MESSAGE_READY,
            )],
        );
        let cluster = FakeClusterClient::new();

        let mut updater = NodeClaimStatusUpdater::new(&claim);
        updater.set_condition(CONDITION_TYPE_READY, STATUS_TRUE, REASON_READY, MESSAGE_READY);

        assert!(!updater.has_changes());
        assert!(!updater.apply(&cluster).await.unwrap());
        assert!(cluster.patched().is_empty());
    }

    #[tokio::test]
    async fn test_updater_patches_claim_without_status() {
        let claim = node_claim("gpupool1", "Standard_NC12s_v3", Some("120Gi"));
        let cluster = FakeClusterClient::new();

        let mut updater = NodeClaimStatusUpdater::new(&claim);
        updater.set_condition(CONDITION_TYPE_READY, STATUS_FALSE, "KubeletNotReady", "");

        assert!(updater.has_changes());
        assert!(updater.apply(&cluster).await.unwrap());

        let patched = cluster.patched();
        assert_eq!(patched.len(), 1);
        assert_eq!(patched[0].0, "gpupool1");
        assert_eq!(patched[0].1, updater.conditions());
    }

    #[tokio::test]
    async fn test_updater_sends_read_resource_version() {
        let mut claim = node_claim("gpupool1", "Standard_NC12s_v3", Some("120Gi"));
        claim.metadata.resource_version = Some("4711".to_string());
        let cluster = FakeClusterClient::new();

        let mut updater = NodeClaimStatusUpdater::new(&claim);
        updater.set_condition(CONDITION_TYPE_READY, STATUS_TRUE, REASON_READY, MESSAGE_READY);
        assert!(updater.apply(&cluster).await.unwrap());

        assert_eq!(cluster.patch_versions(), vec![Some("4711".to_string())]);
    }
}
