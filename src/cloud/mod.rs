// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloud agent pool API.
//!
//! [`AgentPoolClient`] is the only seam through which the provisioner reaches
//! the network. [`arm::ArmClient`] implements it against Azure Resource
//! Manager; tests substitute an in-memory client that records calls and plays
//! back programmed responses.
//!
//! # Modules
//!
//! - [`types`] - Agent pool wire types
//! - [`errors`] - [`CloudError`] and its classification
//! - [`scope`] - Cluster scope and resource paths per cluster variant
//! - [`lro`] - Long-running operation polling helpers
//! - [`credential`] - Bearer token sources
//! - [`arm`] - The HTTP client

pub mod arm;
pub mod credential;
pub mod errors;
pub mod lro;
pub mod scope;
pub mod types;

pub use errors::CloudError;
pub use scope::{ClusterScope, ClusterVariant};
pub use types::AgentPool;

use async_trait::async_trait;

/// Typed access to the agent pools of one cluster.
///
/// Mutating calls block until the cloud operation reaches a terminal state.
#[async_trait]
pub trait AgentPoolClient: Send + Sync {
    /// Create the pool, or update it if it exists, and wait for the operation.
    async fn create_or_update(&self, name: &str, pool: &AgentPool) -> Result<AgentPool, CloudError>;

    /// Read one pool.
    async fn get(&self, name: &str) -> Result<AgentPool, CloudError>;

    /// Delete one pool and wait for the operation.
    async fn delete(&self, name: &str) -> Result<(), CloudError>;

    /// Read every pool of the cluster, following pagination.
    async fn list(&self) -> Result<Vec<AgentPool>, CloudError>;
}
