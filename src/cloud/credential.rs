// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Access token sources for ARM requests.
//!
//! Credential acquisition (workload identity, managed identity, service
//! principals) happens outside the provisioner. The client only needs a bearer
//! token per request, so this module provides the seam plus the two sources the
//! binary supports: a fixed token and a token file that is re-read on every
//! request, which is how projected workload-identity tokens rotate.

use super::errors::CloudError;
use async_trait::async_trait;
use std::path::PathBuf;

/// Source of bearer tokens for ARM.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Return a currently valid access token.
    async fn token(&self) -> Result<String, CloudError>;
}

/// A token fixed at startup.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap a token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl TokenCredential for StaticToken {
    async fn token(&self) -> Result<String, CloudError> {
        if self.0.is_empty() {
            return Err(CloudError::Credential("static token is empty".to_string()));
        }
        Ok(self.0.clone())
    }
}

/// A token read from a file on every request.
#[derive(Debug, Clone)]
pub struct FileToken {
    path: PathBuf,
}

impl FileToken {
    /// Read tokens from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenCredential for FileToken {
    async fn token(&self) -> Result<String, CloudError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CloudError::Credential(format!("reading {}: {e}", self.path.display()))
        })?;
        let token = raw.trim();
        if token.is_empty() {
            return Err(CloudError::Credential(format!(
                "token file {} is empty",
                self.path.display()
            )));
        }
        Ok(token.to_string())
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod credential_tests;
