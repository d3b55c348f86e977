// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types of the instance provider.
//!
//! [`ProviderError`] is what callers of [`InstanceProvider`](crate::instance::InstanceProvider)
//! and the garbage collector see. The variants fall into a few classes that
//! callers treat differently:
//!
//! - **Validation** (`InvalidName`, `MissingInstanceType`, `InvalidStorage`,
//!   `InvalidProviderId`): the NodeClaim can never succeed as written, so it is
//!   not retried and no cloud call is made.
//! - **Not found** (`NodeClaimNotFound`): the pool is gone. `get` and `list`
//!   surface it, `delete` swallows it.
//! - **Transient** (`NodeNotReady`, `Cloud`, `Kubernetes`): retried by the
//!   caller on its next reconcile.
//! - **Batch** (`Aggregate`): several independent failures from one garbage
//!   collection pass.

use crate::cloud::CloudError;
use crate::provider_id::ProviderIdError;
use thiserror::Error;

/// Errors returned by the instance provider and garbage collector.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// NodeClaim name cannot be used as an agent pool name
    #[error("NodeClaim name '{0}' is not a valid agent pool name: must match ^[a-z][a-z0-9]{{0,11}}$")]
    InvalidName(String),

    /// NodeClaim has no instance-type requirement value
    #[error("NodeClaim '{0}' has no node.kubernetes.io/instance-type requirement")]
    MissingInstanceType(String),

    /// NodeClaim storage request is missing or unusable as a disk size
    #[error("NodeClaim '{node_claim}' has an invalid storage request: {reason}")]
    InvalidStorage {
        /// NodeClaim name
        node_claim: String,
        /// What is wrong with the request
        reason: String,
    },

    /// Provider ID could not be parsed
    #[error(transparent)]
    InvalidProviderId(#[from] ProviderIdError),

    /// The agent pool backing the NodeClaim does not exist
    #[error("NodeClaim not found: {0}")]
    NodeClaimNotFound(String),

    /// The pool was created but no single Node with a provider ID showed up in time
    #[error("Node for agent pool '{agent_pool}' not ready after {attempts} attempts")]
    NodeNotReady {
        /// Agent pool name
        agent_pool: String,
        /// Lookups made before giving up
        attempts: u32,
    },

    /// Agent pool API call failed
    #[error("agent pool {operation} failed for '{agent_pool}': {source}")]
    Cloud {
        /// Operation that failed
        operation: &'static str,
        /// Agent pool name, empty for list
        agent_pool: String,
        /// Underlying cloud error
        #[source]
        source: CloudError,
    },

    /// Kubernetes API call failed
    #[error(transparent)]
    Kubernetes(#[from] anyhow::Error),

    /// Several independent operations failed
    #[error("{} operations failed: {}", errors.len(), join_errors(errors))]
    Aggregate {
        /// Every individual failure
        errors: Vec<ProviderError>,
    },
}

fn join_errors(errors: &[ProviderError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ProviderError {
    /// Wrap a cloud error with the operation and pool it concerns.
    #[must_use]
    pub fn cloud(operation: &'static str, agent_pool: &str, source: CloudError) -> Self {
        Self::Cloud {
            operation,
            agent_pool: agent_pool.to_string(),
            source,
        }
    }

    /// Whether the error means the backing pool does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NodeClaimNotFound(_) => true,
            Self::Cloud { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Collapse a list of failures: none is `Ok`, one is itself, more aggregate.
    ///
    /// # Errors
    ///
    /// Returns the single error, or [`ProviderError::Aggregate`] for several.
    pub fn from_batch(mut errors: Vec<ProviderError>) -> Result<(), Self> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Aggregate { errors }),
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
