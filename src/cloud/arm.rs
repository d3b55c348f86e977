// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Azure Resource Manager implementation of [`AgentPoolClient`].
//!
//! # Request Semantics
//!
//! - **create-or-update**: one PUT, never retried. If ARM hands back a poll
//!   target the call waits for the operation to finish and then re-reads the
//!   pool, so callers always see the settled resource.
//! - **get**/**list**: retried on 429/5xx/transport errors with
//!   [`ARM_REQUEST`]. List follows `nextLink` until exhausted.
//! - **delete**: retried like get, then polled to completion.
//!
//! Polling honours `Retry-After`, tolerates transient poll failures and gives
//! up with [`CloudError::Timeout`] once [`PollSettings::timeout`] has elapsed.
//! Dropping the returned future cancels any in-flight request or poll.

use super::credential::TokenCredential;
use super::errors::CloudError;
use super::lro::{retry_after, OperationState, PollSettings, PollTarget};
use super::scope::ClusterScope;
use super::types::{AgentPool, AgentPoolListResult, ArmErrorResponse, OperationStatus};
use super::AgentPoolClient;
use crate::constants::ARM_REQUEST_TIMEOUT_SECS;
use crate::metrics::record_cloud_operation;
use crate::reconcilers::retry::ARM_REQUEST;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

const OP_CREATE_OR_UPDATE: &str = "create_or_update";
const OP_GET: &str = "get";
const OP_DELETE: &str = "delete";
const OP_LIST: &str = "list";

/// Agent pool client talking to ARM over HTTPS.
pub struct ArmClient {
    http: HttpClient,
    endpoint: Url,
    scope: ClusterScope,
    credential: Arc<dyn TokenCredential>,
    poll: PollSettings,
}

impl ArmClient {
    /// Create a client for the agent pools of `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if `endpoint` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(
        endpoint: &str,
        scope: ClusterScope,
        credential: Arc<dyn TokenCredential>,
        poll: PollSettings,
    ) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("invalid ARM endpoint '{endpoint}'"))?;
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(ARM_REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint,
            scope,
            credential,
            poll,
        })
    }

    /// URL of the pool collection, or of one pool.
    fn pools_url(&self, pool_name: Option<&str>) -> Url {
        let path = match pool_name {
            Some(name) => self.scope.agent_pool_path(name),
            None => self.scope.agent_pools_path(),
        };
        let mut url = self.endpoint.clone();
        url.set_path(&path);
        url.query_pairs_mut()
            .append_pair("api-version", self.scope.variant.api_version());
        url
    }

    /// Send an authenticated request; non-2xx responses become [`CloudError::Api`].
    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, CloudError> {
        let token = self.credential.token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| CloudError::Transport { operation, source })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(operation, response).await)
        }
    }

    /// Run an idempotent request, retrying transient failures.
    async fn send_with_retry<F>(
        &self,
        operation: &'static str,
        build: F,
    ) -> Result<Response, CloudError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut backoff = ARM_REQUEST.start();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.send(operation, build()).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => match backoff.next() {
                    Some(delay) => {
                        warn!(
                            operation,
                            attempt,
                            retry_after = ?delay,
                            error = %e,
                            "Retryable ARM error, will retry"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Poll an operation until it reaches a terminal state.
    async fn wait_for_completion(
        &self,
        operation: &'static str,
        target: PollTarget,
        first_delay: Duration,
    ) -> Result<(), CloudError> {
        let deadline = Instant::now() + self.poll.timeout;
        let mut delay = first_delay;

        loop {
            if Instant::now() + delay > deadline {
                return Err(CloudError::Timeout {
                    operation,
                    timeout: self.poll.timeout,
                });
            }
            tokio::time::sleep(delay).await;

            let response = match self
                .send(operation, self.http.get(target.url().clone()))
                .await
            {
                Ok(response) => response,
                Err(e) if e.is_retryable() => {
                    warn!(operation, error = %e, "Transient error while polling, will poll again");
                    delay = self.poll.interval;
                    continue;
                }
                Err(e) => return Err(e),
            };
            delay = retry_after(response.headers(), self.poll.interval);

            match &target {
                PollTarget::Location(_) => {
                    if response.status() != StatusCode::ACCEPTED {
                        return Ok(());
                    }
                }
                PollTarget::AsyncOperation(_) => {
                    let status: OperationStatus = read_json(operation, response).await?;
                    match OperationState::parse(&status.status) {
                        OperationState::InProgress => {}
                        OperationState::Succeeded => return Ok(()),
                        OperationState::Failed | OperationState::Canceled => {
                            let detail = status.error.unwrap_or_default();
                            return Err(CloudError::OperationFailed {
                                operation,
                                status: status.status,
                                code: detail.code,
                                message: detail.message,
                            });
                        }
                    }
                }
            }
            debug!(operation, next_poll = ?delay, "Long-running operation still in progress");
        }
    }

    async fn create_or_update_pool(
        &self,
        name: &str,
        pool: &AgentPool,
    ) -> Result<AgentPool, CloudError> {
        info!(agent_pool = %name, "Creating or updating agent pool");
        let response = self
            .send(
                OP_CREATE_OR_UPDATE,
                self.http.put(self.pools_url(Some(name))).json(pool),
            )
            .await?;

        match PollTarget::from_headers(response.headers()) {
            Some(target) => {
                let first_delay = retry_after(response.headers(), self.poll.interval);
                self.wait_for_completion(OP_CREATE_OR_UPDATE, target, first_delay)
                    .await?;
                self.get_pool(name).await
            }
            None => read_json(OP_CREATE_OR_UPDATE, response).await,
        }
    }

    async fn get_pool(&self, name: &str) -> Result<AgentPool, CloudError> {
        let url = self.pools_url(Some(name));
        let response = self
            .send_with_retry(OP_GET, || self.http.get(url.clone()))
            .await?;
        read_json(OP_GET, response).await
    }

    async fn delete_pool(&self, name: &str) -> Result<(), CloudError> {
        info!(agent_pool = %name, "Deleting agent pool");
        let url = self.pools_url(Some(name));
        let response = self
            .send_with_retry(OP_DELETE, || self.http.delete(url.clone()))
            .await?;

        match PollTarget::from_headers(response.headers()) {
            Some(target) => {
                let first_delay = retry_after(response.headers(), self.poll.interval);
                self.wait_for_completion(OP_DELETE, target, first_delay).await
            }
            None => Ok(()),
        }
    }

    async fn list_pools(&self) -> Result<Vec<AgentPool>, CloudError> {
        let mut pools = Vec::new();
        let mut next = Some(self.pools_url(None));
        let mut page_count = 0;

        while let Some(url) = next.take() {
            page_count += 1;
            let response = self
                .send_with_retry(OP_LIST, || self.http.get(url.clone()))
                .await?;
            let page: AgentPoolListResult = read_json(OP_LIST, response).await?;
            pools.extend(page.value);

            next = match page.next_link.filter(|link| !link.is_empty()) {
                Some(link) => Some(Url::parse(&link).map_err(|e| CloudError::InvalidResponse {
                    operation: OP_LIST,
                    reason: format!("invalid nextLink '{link}': {e}"),
                })?),
                None => None,
            };
        }

        debug!(
            total_pages = page_count,
            total_pools = pools.len(),
            "Listed agent pools"
        );
        Ok(pools)
    }
}

/// Decode a JSON body.
async fn read_json<T: DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> Result<T, CloudError> {
    let body = response
        .bytes()
        .await
        .map_err(|source| CloudError::Transport { operation, source })?;
    serde_json::from_slice(&body).map_err(|e| CloudError::InvalidResponse {
        operation,
        reason: e.to_string(),
    })
}

/// Turn an error response into [`CloudError::Api`], keeping the ARM code.
async fn api_error(operation: &'static str, response: Response) -> CloudError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ArmErrorResponse>(&body)
        .ok()
        .and_then(|envelope| envelope.error);

    let (code, message) = match detail {
        Some(detail) => (detail.code, detail.message),
        None => (String::new(), body),
    };

    debug!(operation, status = %status, code = %code, "ARM request failed");
    CloudError::Api {
        operation,
        status,
        code,
        message,
    }
}

/// Record the outcome of one client operation.
fn observe<T>(operation: &str, started: Instant, result: &Result<T, CloudError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(e) => e.metric_label(),
    };
    record_cloud_operation(operation, outcome, started.elapsed());
}

#[async_trait]
impl AgentPoolClient for ArmClient {
    async fn create_or_update(&self, name: &str, pool: &AgentPool) -> Result<AgentPool, CloudError> {
        let started = Instant::now();
        let result = self.create_or_update_pool(name, pool).await;
        observe(OP_CREATE_OR_UPDATE, started, &result);
        result
    }

    async fn get(&self, name: &str) -> Result<AgentPool, CloudError> {
        let started = Instant::now();
        let result = self.get_pool(name).await;
        observe(OP_GET, started, &result);
        result
    }

    async fn delete(&self, name: &str) -> Result<(), CloudError> {
        let started = Instant::now();
        let result = self.delete_pool(name).await;
        observe(OP_DELETE, started, &result);
        result
    }

    async fn list(&self) -> Result<Vec<AgentPool>, CloudError> {
        let started = Instant::now();
        let result = self.list_pools().await;
        observe(OP_LIST, started, &result);
        result
    }
}

#[cfg(test)]
#[path = "arm_tests.rs"]
mod arm_tests;
