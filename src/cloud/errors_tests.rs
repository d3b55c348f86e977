// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

#[cfg(test)]
mod tests {
    use super::super::CloudError;
    use reqwest::StatusCode;
    use std::time::Duration;

    fn api(status: StatusCode, code: &str, message: &str) -> CloudError {
        CloudError::Api {
            operation: "create_or_update",
            status,
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_not_found_by_status_or_code() {
        assert!(api(StatusCode::NOT_FOUND, "", "").is_not_found());
        assert!(api(StatusCode::BAD_REQUEST, "ResourceNotFound", "gone").is_not_found());
        assert!(CloudError::OperationFailed {
            operation: "delete",
            status: "Failed".to_string(),
            code: "NotFound".to_string(),
            message: "agent pool not found".to_string(),
        }
        .is_not_found());
        assert!(!api(StatusCode::CONFLICT, "Conflict", "busy").is_not_found());
    }

    #[test]
    fn test_create_in_progress_code_needs_a_create() {
        assert!(api(
            StatusCode::CONFLICT,
            "AnotherOperationInProgress",
            "Operation is not allowed: Another operation (Creating agent pool) is in progress, please wait for it to finish",
        )
        .is_create_in_progress());
    }

    #[test]
    fn test_other_operation_in_progress_is_not_a_create() {
        for message in [
            "Operation is not allowed: Another operation (Deleting agent pool) is in progress, please wait for it to finish",
            "Operation is not allowed: Another operation (Upgrading agent pool) is in progress",
            "busy",
        ] {
            let err = api(StatusCode::CONFLICT, "AnotherOperationInProgress", message);
            assert!(!err.is_create_in_progress(), "{message}");
        }
    }

    #[test]
    fn test_create_in_progress_falls_back_to_message() {
        let err = api(
            StatusCode::BAD_REQUEST,
            "OperationNotAllowed",
            "Operation is not allowed because there's an in progress create node pool operation",
        );
        assert!(err.is_create_in_progress());
        assert!(!api(StatusCode::BAD_REQUEST, "OperationNotAllowed", "quota exceeded").is_create_in_progress());
    }

    #[test]
    fn test_only_api_errors_signal_create_in_progress() {
        let err = CloudError::OperationFailed {
            operation: "create_or_update",
            status: "Failed".to_string(),
            code: "AnotherOperationInProgress".to_string(),
            message: String::new(),
        };
        assert!(!err.is_create_in_progress());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(api(StatusCode::TOO_MANY_REQUESTS, "", "").is_retryable());
        assert!(api(StatusCode::SERVICE_UNAVAILABLE, "", "").is_retryable());
        assert!(!api(StatusCode::BAD_REQUEST, "", "").is_retryable());
        assert!(!CloudError::Timeout {
            operation: "delete",
            timeout: Duration::from_secs(1),
        }
        .is_retryable());
    }

    #[test]
    fn test_metric_labels() {
        assert_eq!(api(StatusCode::NOT_FOUND, "", "").metric_label(), "not_found");
        assert_eq!(api(StatusCode::BAD_REQUEST, "", "").metric_label(), "api_error");
        assert_eq!(
            CloudError::Credential("no token".to_string()).metric_label(),
            "credential_error"
        );
    }

    #[test]
    fn test_display_includes_code_and_message() {
        let err = api(StatusCode::BAD_REQUEST, "InvalidParameter", "vmSize is invalid");
        let text = err.to_string();
        assert!(text.contains("create_or_update"));
        assert!(text.contains("InvalidParameter"));
        assert!(text.contains("vmSize is invalid"));
    }
}
