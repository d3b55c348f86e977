// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry pacing and error classification.
//!
//! A [`BackoffPolicy`] is a fixed description of how to space retries; calling
//! [`BackoffPolicy::start`] yields a [`Backoff`], an iterator of delays that
//! ends once the attempt or time budget is spent. Three policies are used:
//!
//! | Policy | Used for | Delays |
//! |--------|----------|--------|
//! | [`KUBE_API`] | Kubernetes calls | 100ms doubling to 30s, 5 minutes total |
//! | [`ARM_REQUEST`] | idempotent ARM calls | 500ms doubling to 10s, 2 minutes total |
//! | [`NODE_RESOLUTION`] | Node of a new pool | 1s linear, 15 attempts |
//!
//! Elapsed time is measured on the Tokio clock, so a paused test runtime
//! controls it.

use crate::constants::{
    NODE_RESOLUTION_FACTOR, NODE_RESOLUTION_INTERVAL_MILLIS, NODE_RESOLUTION_JITTER,
    NODE_RESOLUTION_STEPS,
};
use anyhow::Result;
use rand::Rng;
use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// How retries of one kind of call are spaced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// First delay
    pub initial: Duration,
    /// Upper bound of a single delay
    pub cap: Duration,
    /// Growth of the delay per retry (1.0 keeps it constant)
    pub factor: f64,
    /// Relative spread applied to each delay (0.1 is ±10%)
    pub jitter: f64,
    /// Stop once this much time has passed since [`start`](Self::start)
    pub deadline: Option<Duration>,
    /// Stop after handing out this many delays
    pub max_delays: Option<u32>,
}

/// Kubernetes API calls (429/5xx/transport errors)
pub const KUBE_API: BackoffPolicy = BackoffPolicy {
    initial: Duration::from_millis(100),
    cap: Duration::from_secs(30),
    factor: 2.0,
    jitter: 0.1,
    deadline: Some(Duration::from_secs(300)),
    max_delays: None,
};

/// Idempotent ARM requests and operation polls
pub const ARM_REQUEST: BackoffPolicy = BackoffPolicy {
    initial: Duration::from_millis(500),
    cap: Duration::from_secs(10),
    factor: 2.0,
    jitter: 0.1,
    deadline: Some(Duration::from_secs(120)),
    max_delays: None,
};

/// Waiting for the Node of a new agent pool.
///
/// [`NODE_RESOLUTION_STEPS`] attempts are separated by one fewer delays.
pub const NODE_RESOLUTION: BackoffPolicy = BackoffPolicy {
    initial: Duration::from_millis(NODE_RESOLUTION_INTERVAL_MILLIS),
    cap: Duration::from_millis(NODE_RESOLUTION_INTERVAL_MILLIS),
    factor: NODE_RESOLUTION_FACTOR,
    jitter: NODE_RESOLUTION_JITTER,
    deadline: None,
    max_delays: Some(NODE_RESOLUTION_STEPS - 1),
};

impl BackoffPolicy {
    /// Start a fresh sequence of delays; the deadline counts from now.
    #[must_use]
    pub fn start(self) -> Backoff {
        Backoff {
            policy: self,
            next_delay: self.initial,
            handed_out: 0,
            started: Instant::now(),
        }
    }
}

/// Delays of one retry loop. `None` means give up.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    next_delay: Duration,
    handed_out: u32,
    started: Instant,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let policy = &self.policy;
        let past_deadline = policy
            .deadline
            .is_some_and(|deadline| self.started.elapsed() >= deadline);
        let out_of_delays = policy
            .max_delays
            .is_some_and(|max| self.handed_out >= max);
        if past_deadline || out_of_delays {
            return None;
        }

        self.handed_out += 1;
        let delay = self.next_delay;
        self.next_delay = delay.mul_f64(policy.factor).min(policy.cap);
        Some(spread(delay, policy.jitter))
    }
}

/// `delay` moved uniformly within `±jitter` of itself.
fn spread(delay: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return delay;
    }
    let secs = delay.as_secs_f64();
    let offset = secs * jitter;
    Duration::from_secs_f64(rand::rng().random_range((secs - offset)..=(secs + offset)).max(0.0))
}

/// Whether an HTTP status is worth retrying: 429 and the transient 5xx family.
#[must_use]
pub fn is_retryable_http_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || matches!(
            status,
            StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        )
}

/// Whether a Kubernetes error is transient (429, 5xx, transport).
///
/// Not-found and conflicts go back to the caller.
pub(crate) fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(response) => {
            response.code == 429 || (500..600).contains(&response.code)
        }
        kube::Error::Service(_) => true,
        _ => false,
    }
}

/// Whether a Kubernetes error is a 404.
#[must_use]
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

/// Run a Kubernetes call, retrying transient failures with [`KUBE_API`].
///
/// ```no_run
/// use k8s_openapi::api::core::v1::Node;
/// use kube::{Api, Client};
/// use agentpool_provisioner::reconcilers::retry::retry_api_call;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let nodes: Api<Node> = Api::all(client);
///
/// let node = retry_api_call(|| nodes.get("aks-gpupool1-0"), "get node").await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// The first non-retryable error, or the last error once the backoff runs out.
pub async fn retry_api_call<T, F, Fut>(mut call: F, what: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    let mut delays = KUBE_API.start();
    let mut attempt = 1u32;

    loop {
        let err = match call().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = what, attempt, "Kubernetes call succeeded after retries");
                }
                return Ok(value);
            }
            Err(err) if !is_retryable_error(&err) => return Err(err.into()),
            Err(err) => err,
        };

        let Some(delay) = delays.next() else {
            error!(operation = what, attempt, error = %err, "Giving up on Kubernetes call");
            anyhow::bail!("{what} failed after {attempt} attempts: {err}");
        };
        warn!(operation = what, attempt, retry_in = ?delay, error = %err, "Kubernetes call failed, retrying");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
