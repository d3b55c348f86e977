// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `arm.rs`

#[cfg(test)]
mod tests {
    use super::super::ArmClient;
    use crate::cloud::credential::StaticToken;
    use crate::cloud::errors::CloudError;
    use crate::cloud::lro::PollSettings;
    use crate::cloud::scope::{ClusterScope, ClusterVariant};
    use crate::cloud::types::{AgentPool, AgentPoolProperties};
    use crate::cloud::AgentPoolClient;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const POOLS_PATH: &str = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.ContainerService/managedClusters/cluster/agentPools";

    fn pool_path(name: &str) -> String {
        format!("{POOLS_PATH}/{name}")
    }

    fn client(server: &MockServer, timeout: Duration) -> ArmClient {
        let scope = ClusterScope {
            subscription_id: "sub".to_string(),
            resource_group: "rg".to_string(),
            cluster_name: "cluster".to_string(),
            variant: ClusterVariant::Managed,
        };
        ArmClient::new(
            &server.uri(),
            scope,
            Arc::new(StaticToken::new("test-token")),
            PollSettings {
                interval: Duration::from_millis(10),
                timeout,
            },
        )
        .unwrap()
    }

    fn pool_json(name: &str, state: &str) -> serde_json::Value {
        json!({
            "id": pool_path(name),
            "name": name,
            "properties": {
                "count": 1,
                "vmSize": "Standard_NC12s_v3",
                "osDiskSizeGB": 120,
                "provisioningState": state,
                "nodeLabels": { "kaito.sh/workspace": "falcon" }
            }
        })
    }

    fn desired_pool() -> AgentPool {
        AgentPool {
            properties: AgentPoolProperties {
                count: Some(1),
                vm_size: Some("Standard_NC12s_v3".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_polls_async_operation_then_reads_pool() {
        let server = MockServer::start().await;
        let operation_url = format!("{}/operations/op1", server.uri());

        Mock::given(method("PUT"))
            .and(path(pool_path("gpupool1")))
            .and(query_param("api-version", "2024-02-01"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Azure-AsyncOperation", operation_url.as_str())
                    .set_body_json(pool_json("gpupool1", "Creating")),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/op1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "InProgress" })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/op1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "Succeeded" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(pool_path("gpupool1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(pool_json("gpupool1", "Succeeded")))
            .expect(1)
            .mount(&server)
            .await;

        let pool = client(&server, Duration::from_secs(5))
            .create_or_update("gpupool1", &desired_pool())
            .await
            .unwrap();

        assert_eq!(pool.name.as_deref(), Some("gpupool1"));
        assert_eq!(pool.provisioning_state(), "Succeeded");
        assert_eq!(pool.properties.os_disk_size_gb, Some(120));
        assert_eq!(pool.label("kaito.sh/workspace"), Some("falcon"));
    }

    #[tokio::test]
    async fn test_create_is_not_retried_and_keeps_error_code() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path(pool_path("gpupool1")))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": {
                    "code": "AnotherOperationInProgress",
                    "message": "Another operation (Create) is in progress"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_secs(5))
            .create_or_update("gpupool1", &desired_pool())
            .await
            .unwrap_err();

        assert!(err.is_create_in_progress());
        assert_eq!(err.code(), Some("AnotherOperationInProgress"));
    }

    #[tokio::test]
    async fn test_create_server_error_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_secs(5))
            .create_or_update("gpupool1", &desired_pool())
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::Api { ref message, .. } if message == "boom"));
    }

    #[tokio::test]
    async fn test_create_operation_failure() {
        let server = MockServer::start().await;
        let operation_url = format!("{}/operations/op2", server.uri());

        Mock::given(method("PUT"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Azure-AsyncOperation", operation_url.as_str())
                    .set_body_json(pool_json("gpupool1", "Creating")),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/op2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "Failed",
                "error": { "code": "QuotaExceeded", "message": "not enough cores" }
            })))
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_secs(5))
            .create_or_update("gpupool1", &desired_pool())
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::OperationFailed { .. }));
        assert_eq!(err.code(), Some("QuotaExceeded"));
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(pool_path("missing")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "NotFound", "message": "agent pool not found" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_secs(5))
            .get("missing")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_retries_transient_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(pool_path("gpupool1")))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(pool_path("gpupool1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(pool_json("gpupool1", "Succeeded")))
            .mount(&server)
            .await;

        let pool = client(&server, Duration::from_secs(5))
            .get("gpupool1")
            .await
            .unwrap();
        assert_eq!(pool.provisioning_state(), "Succeeded");
    }

    #[tokio::test]
    async fn test_list_follows_next_link() {
        let server = MockServer::start().await;
        let next_link = format!("{}/pages/2", server.uri());

        Mock::given(method("GET"))
            .and(path(POOLS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [pool_json("nodepool1", "Succeeded"), pool_json("gpupool1", "Succeeded")],
                "nextLink": next_link
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pages/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [pool_json("gpupool2", "Deleting")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let pools = client(&server, Duration::from_secs(5)).list().await.unwrap();
        let names: Vec<_> = pools.iter().filter_map(|p| p.name.as_deref()).collect();
        assert_eq!(names, vec!["nodepool1", "gpupool1", "gpupool2"]);
    }

    #[tokio::test]
    async fn test_delete_polls_location_until_done() {
        let server = MockServer::start().await;
        let location = format!("{}/results/del1", server.uri());

        Mock::given(method("DELETE"))
            .and(path(pool_path("gpupool1")))
            .respond_with(ResponseTemplate::new(202).insert_header("Location", location.as_str()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/results/del1"))
            .respond_with(ResponseTemplate::new(202))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/results/del1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server, Duration::from_secs(5))
            .delete("gpupool1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_tolerates_transient_poll_failure() {
        let server = MockServer::start().await;
        let operation_url = format!("{}/operations/del2", server.uri());

        Mock::given(method("DELETE"))
            .respond_with(
                ResponseTemplate::new(202).insert_header("Azure-AsyncOperation", operation_url.as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/del2"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/del2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "Succeeded" })))
            .mount(&server)
            .await;

        client(&server, Duration::from_secs(5))
            .delete("gpupool1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_not_found_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_secs(5))
            .delete("gpupool1")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_polling_times_out() {
        let server = MockServer::start().await;
        let operation_url = format!("{}/operations/slow", server.uri());

        Mock::given(method("DELETE"))
            .respond_with(
                ResponseTemplate::new(202).insert_header("Azure-AsyncOperation", operation_url.as_str()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/slow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "InProgress" })))
            .mount(&server)
            .await;

        let err = client(&server, Duration::from_millis(100))
            .delete("gpupool1")
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Timeout { .. }));
    }
}
