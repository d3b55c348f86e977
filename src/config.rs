// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command line and environment configuration of the provisioner binary.
//!
//! Every flag can also be set through the environment variable named next to
//! it, which is how the Deployment manifest configures the controller.

use crate::cloud::credential::{FileToken, StaticToken, TokenCredential};
use crate::cloud::lro::PollSettings;
use crate::cloud::{ClusterScope, ClusterVariant};
use crate::constants::{
    DEFAULT_ARM_ENDPOINT, DEFAULT_METRICS_BIND_ADDRESS, GC_INTERVAL_SECS, LRO_POLL_INTERVAL_SECS,
    LRO_TIMEOUT_SECS,
};
use anyhow::{bail, Context as _, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Agent pool provisioner for Karpenter `NodeClaim`s.
#[derive(Clone, Debug, Parser)]
#[command(name = "agentpool-provisioner", version, about, long_about = None)]
pub struct Config {
    /// Subscription of the cluster
    #[arg(long, env = "AZURE_SUBSCRIPTION_ID")]
    pub subscription_id: String,

    /// Resource group of the cluster resource
    #[arg(long, env = "AZURE_RESOURCE_GROUP")]
    pub resource_group: String,

    /// Name of the cluster resource
    #[arg(long, env = "AZURE_CLUSTER_NAME")]
    pub cluster_name: String,

    /// Which container service hosts the agent pools
    #[arg(long, env = "CLUSTER_VARIANT", value_enum, default_value_t = ClusterVariant::Managed)]
    pub variant: ClusterVariant,

    /// Azure Resource Manager endpoint
    #[arg(long, env = "ARM_ENDPOINT", default_value = DEFAULT_ARM_ENDPOINT)]
    pub arm_endpoint: String,

    /// Bearer token for ARM requests
    #[arg(long, env = "ARM_ACCESS_TOKEN", hide_env_values = true, conflicts_with = "token_file")]
    pub access_token: Option<String>,

    /// File holding the ARM bearer token, re-read on every request
    #[arg(long, env = "ARM_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Seconds between garbage collection passes
    #[arg(long, env = "GC_INTERVAL_SECS", default_value_t = GC_INTERVAL_SECS)]
    pub gc_interval_secs: u64,

    /// Seconds between polls of a long-running cloud operation
    #[arg(long, env = "LRO_POLL_INTERVAL_SECS", default_value_t = LRO_POLL_INTERVAL_SECS)]
    pub lro_poll_interval_secs: u64,

    /// Seconds before a long-running cloud operation is abandoned
    #[arg(long, env = "LRO_TIMEOUT_SECS", default_value_t = LRO_TIMEOUT_SECS)]
    pub lro_timeout_secs: u64,

    /// Address of the metrics and health endpoints
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: String,
}

impl Config {
    /// Cluster scope of the agent pools.
    #[must_use]
    pub fn scope(&self) -> ClusterScope {
        ClusterScope {
            subscription_id: self.subscription_id.clone(),
            resource_group: self.resource_group.clone(),
            cluster_name: self.cluster_name.clone(),
            variant: self.variant,
        }
    }

    #[must_use]
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.lro_poll_interval_secs),
            timeout: Duration::from_secs(self.lro_timeout_secs),
        }
    }

    #[must_use]
    pub fn gc_interval(&self) -> Duration {
        Duration::from_secs(self.gc_interval_secs)
    }

    /// Token source for ARM requests.
    ///
    /// # Errors
    ///
    /// Returns an error if neither a token nor a token file is configured.
    pub fn credential(&self) -> Result<Arc<dyn TokenCredential>> {
        match (&self.access_token, &self.token_file) {
            (Some(token), _) => Ok(Arc::new(StaticToken::new(token.clone()))),
            (None, Some(path)) => Ok(Arc::new(FileToken::new(path.clone()))),
            (None, None) => bail!("one of --access-token or --token-file is required"),
        }
    }

    /// Parsed metrics bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is not `host:port`.
    pub fn metrics_addr(&self) -> Result<SocketAddr> {
        self.metrics_bind_address
            .parse()
            .with_context(|| format!("invalid metrics bind address '{}'", self.metrics_bind_address))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
