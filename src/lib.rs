// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Agent Pool Provisioner - Managed agent pools for Karpenter `NodeClaim`s
//!
//! Backs each Karpenter `NodeClaim` with one single-node agent pool of a
//! managed (or connected hybrid) Kubernetes cluster, and keeps the two in sync
//! despite the cloud's asynchronous, eventually consistent API.
//!
//! ## Overview
//!
//! - An [`instance::InstanceProvider`] creates, reads, lists and deletes agent
//!   pools on behalf of `NodeClaim`s and correlates them with the Nodes they
//!   register
//! - A [`reconcilers::GarbageCollector`] periodically deletes agent pools (and
//!   their Nodes) whose `NodeClaim` is gone
//! - A status controller mirrors Node readiness onto the owning `NodeClaim`
//!
//! ## Modules
//!
//! - [`cloud`] - Agent pool API client (ARM) and wire types
//! - [`instance`] - Instance provider for managed and hybrid clusters
//! - [`reconcilers`] - Garbage collection and status controllers
//! - [`cluster`] - Kubernetes access used by the provider and controllers
//! - [`crd`] - The Karpenter `NodeClaim` resource
//! - [`context`] - Reflector store shared with the status controller
//! - [`config`] - Command line and environment configuration
//! - [`server`] - Metrics and health endpoints
//!
//! ## Example
//!
//! ```rust,no_run
//! use agentpool_provisioner::cloud::{ClusterScope, ClusterVariant};
//!
//! let scope = ClusterScope {
//!     subscription_id: "00000000-0000-0000-0000-000000000000".to_string(),
//!     resource_group: "rg".to_string(),
//!     cluster_name: "aks1".to_string(),
//!     variant: ClusterVariant::Managed,
//! };
//! println!("{}", scope.agent_pool_path("gpupool1"));
//! ```

pub mod cloud;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod instance;
pub mod labels;
pub mod metrics;
pub mod provider_id;
pub mod quantity;
pub mod reconcilers;
pub mod server;
pub mod status_reasons;

#[cfg(test)]
pub(crate) mod testing;
