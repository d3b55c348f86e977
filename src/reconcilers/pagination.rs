// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Paged Kubernetes list calls.
//!
//! Nodes and `NodeClaim`s are listed on every garbage collection pass and on
//! every node lookup. Pages of [`KUBE_LIST_PAGE_SIZE`] keep each response
//! small; every page is fetched through [`retry_api_call`], so a transient
//! failure in the middle of a listing does not restart it.

use crate::constants::KUBE_LIST_PAGE_SIZE;
use crate::reconcilers::retry::retry_api_call;
use anyhow::Result;
use kube::{api::ListParams, Api, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// Every object matching `params`, fetched page by page.
///
/// ```no_run
/// use kube::{Api, Client, api::ListParams};
/// use agentpool_provisioner::crd::NodeClaim;
/// use agentpool_provisioner::reconcilers::pagination::list_all_paginated;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let claims: Api<NodeClaim> = Api::all(client);
///
/// let all = list_all_paginated(&claims, ListParams::default()).await?;
/// println!("{} node claims", all.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the error of the first page that cannot be fetched.
pub async fn list_all_paginated<K>(api: &Api<K>, params: ListParams) -> Result<Vec<K>>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
{
    let mut params = params.limit(KUBE_LIST_PAGE_SIZE);
    let mut items = Vec::new();
    let mut pages = 0u32;

    loop {
        let page = retry_api_call(|| api.list(&params), "list page").await?;
        pages += 1;
        items.extend(page.items);

        match page.metadata.continue_.filter(|token| !token.is_empty()) {
            Some(token) => params = params.continue_token(&token),
            None => break,
        }
    }

    debug!(pages, items = items.len(), "Listed all pages");
    Ok(items)
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod pagination_tests;
