// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Long-running operation (LRO) helpers.
//!
//! ARM answers a PUT or DELETE on an agent pool before the work is done and
//! tells the caller where to poll:
//!
//! - `Azure-AsyncOperation`: a status document whose `status` field is
//!   `InProgress` until it becomes `Succeeded`, `Failed` or `Canceled`
//! - `Location`: a URL that answers 202 while the operation runs and 200/204
//!   once it has finished
//!
//! Either response may carry `Retry-After` (seconds) to pace the poller.

use crate::constants::{LRO_POLL_INTERVAL_SECS, LRO_TIMEOUT_SECS};
use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use std::time::Duration;
use url::Url;

/// Header naming the status document of an async operation
pub const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Upper bound honoured for a server-provided `Retry-After`
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Pacing and deadline of LRO polling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between polls when the server gives no `Retry-After`
    pub interval: Duration,
    /// Deadline for the whole operation
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(LRO_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(LRO_TIMEOUT_SECS),
        }
    }
}

/// Where to poll for the outcome of an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollTarget {
    /// Status document URL from `Azure-AsyncOperation`
    AsyncOperation(Url),
    /// Resource-style URL from `Location`
    Location(Url),
}

impl PollTarget {
    /// Pick the poll target from response headers, preferring `Azure-AsyncOperation`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header_url = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Url::parse(value).ok())
        };

        header_url(AZURE_ASYNC_OPERATION)
            .map(Self::AsyncOperation)
            .or_else(|| header_url(LOCATION.as_str()).map(Self::Location))
    }

    /// URL to poll.
    #[must_use]
    pub fn url(&self) -> &Url {
        match self {
            Self::AsyncOperation(url) | Self::Location(url) => url,
        }
    }
}

/// State of an operation according to its status document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    /// Still running (also used for unknown values)
    InProgress,
    /// Finished successfully
    Succeeded,
    /// Finished with an error
    Failed,
    /// Canceled before finishing
    Canceled,
}

impl OperationState {
    /// Interpret the `status` field of a status document.
    #[must_use]
    pub fn parse(status: &str) -> Self {
        if status.eq_ignore_ascii_case("Succeeded") {
            Self::Succeeded
        } else if status.eq_ignore_ascii_case("Failed") {
            Self::Failed
        } else if status.eq_ignore_ascii_case("Canceled") || status.eq_ignore_ascii_case("Cancelled") {
            Self::Canceled
        } else {
            Self::InProgress
        }
    }
}

/// Delay requested by `Retry-After`, or `default` when absent or unparseable.
///
/// Only the delta-seconds form is honoured; values are capped at one minute.
#[must_use]
pub fn retry_after(headers: &HeaderMap, default: Duration) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map_or(default, |secs| {
            Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS))
        })
}

#[cfg(test)]
#[path = "lro_tests.rs"]
mod lro_tests;
