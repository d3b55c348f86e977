// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Errors returned by the agent pool client.
//!
//! ARM reports failures in two places: the HTTP response of the request itself
//! and, for long-running operations, the terminal status document. Both end up
//! in [`CloudError`] with the ARM error code preserved, so callers classify on
//! codes rather than message text wherever ARM provides one.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Error codes ARM uses for a missing resource
const NOT_FOUND_CODES: &[&str] = &["NotFound", "ResourceNotFound", "AgentPoolNotFound"];

/// Error code ARM uses when another operation holds the resource
const OPERATION_IN_PROGRESS_CODE: &str = "AnotherOperationInProgress";

/// Message fragment the container service uses for a concurrent pool create
const CREATE_IN_PROGRESS_MESSAGE: &str = "in progress create";

/// How a conflicting create names itself in an operation-in-progress message
/// ("Another operation (Creating agent pool) is in progress")
const CREATE_OPERATION_FRAGMENT: &str = "creat";

/// Errors from the agent pool client.
#[derive(Error, Debug)]
pub enum CloudError {
    /// ARM rejected the request.
    #[error("{operation} failed with HTTP {status}: {code}: {message}")]
    Api {
        /// Client operation, e.g. `create_or_update`
        operation: &'static str,
        /// HTTP status of the response
        status: StatusCode,
        /// ARM error code (may be empty)
        code: String,
        /// ARM error message
        message: String,
    },

    /// A long-running operation reached a failed or canceled terminal state.
    #[error("{operation} long-running operation ended {status}: {code}: {message}")]
    OperationFailed {
        /// Client operation
        operation: &'static str,
        /// Terminal status (`Failed` or `Canceled`)
        status: String,
        /// ARM error code (may be empty)
        code: String,
        /// ARM error message
        message: String,
    },

    /// A long-running operation did not finish within the deadline.
    #[error("{operation} long-running operation did not finish within {timeout:?}")]
    Timeout {
        /// Client operation
        operation: &'static str,
        /// Deadline that expired
        timeout: Duration,
    },

    /// The request could not be sent or the response could not be read.
    #[error("{operation} transport error: {source}")]
    Transport {
        /// Client operation
        operation: &'static str,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// ARM answered with something the client cannot interpret.
    #[error("{operation} returned an invalid response: {reason}")]
    InvalidResponse {
        /// Client operation
        operation: &'static str,
        /// What was wrong
        reason: String,
    },

    /// No access token could be obtained.
    #[error("failed to acquire access token: {0}")]
    Credential(String),
}

impl CloudError {
    /// ARM error code, when the failure carried one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } | Self::OperationFailed { code, .. } if !code.is_empty() => {
                Some(code.as_str())
            }
            _ => None,
        }
    }

    /// Whether the resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        if let Self::Api { status, .. } = self {
            if *status == StatusCode::NOT_FOUND {
                return true;
            }
        }
        self.code()
            .is_some_and(|code| NOT_FOUND_CODES.iter().any(|c| c.eq_ignore_ascii_case(code)))
    }

    /// Whether the pool already has a create operation running.
    ///
    /// The structured code covers every conflicting operation (delete,
    /// upgrade, scale), so it only counts when the message names a create.
    /// Without the code, the service's create-in-progress message is matched.
    #[must_use]
    pub fn is_create_in_progress(&self) -> bool {
        let Self::Api { code, message, .. } = self else {
            return false;
        };
        let message = message.to_ascii_lowercase();
        if code.eq_ignore_ascii_case(OPERATION_IN_PROGRESS_CODE) {
            return message.contains(CREATE_OPERATION_FRAGMENT);
        }
        message.contains(CREATE_IN_PROGRESS_MESSAGE)
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => {
                crate::reconcilers::retry::is_retryable_http_status(*status)
            }
            Self::Transport { .. } => true,
            _ => false,
        }
    }

    /// Short label used as the `result` metric dimension.
    #[must_use]
    pub fn metric_label(&self) -> &'static str {
        match self {
            _ if self.is_not_found() => "not_found",
            Self::Api { .. } => "api_error",
            Self::OperationFailed { .. } => "operation_failed",
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport_error",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::Credential(_) => "credential_error",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
