// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Background controllers of the provisioner.
//!
//! # Available Controllers
//!
//! - [`garbage_collection`] - Periodically deletes agent pools (and their
//!   Nodes) that no longer have a `NodeClaim`
//! - [`nodeclaim_status`] - Mirrors Node readiness onto the owning `NodeClaim`
//!
//! # Shared Helpers
//!
//! - [`status`] - Condition editing and change-detecting status patches
//! - [`retry`] - Exponential backoff for Kubernetes and cloud calls
//! - [`pagination`] - Paginated Kubernetes list calls

pub mod garbage_collection;
pub mod nodeclaim_status;
pub mod pagination;
pub mod retry;
pub mod status;

pub use garbage_collection::GarbageCollector;
