//! Stale-while-revalidate, used for static bundles, styles and scripts.

use std::sync::Arc;

use reqwest::StatusCode;
use waypoint_core::{Error, PartitionRole};

use super::{SharedContext, StrategyContext};
use crate::fetch::{ResourceRequest, ResourceResponse};

/// Serve a cached asset immediately and refresh it in the background.
///
/// On a hit the caller gets the stored copy without waiting on the network;
/// a detached refresh overwrites the entry only with a `200` response and
/// swallows its own failures. On a miss the asset is fetched within the
/// static timeout and stored when OK; if that attempt fails, one unbounded
/// attempt is made and its outcome, error included, goes to the caller.
/// Executable code has no safe synthetic substitute, so this is the one
/// strategy that can surface a network error.
pub async fn stale_while_revalidate(
    ctx: &SharedContext, request: &ResourceRequest,
) -> Result<ResourceResponse, Error> {
    if let Some(cached) = ctx.lookup(PartitionRole::Static, request).await {
        let task_ctx = Arc::clone(ctx);
        let task_request = request.clone();
        ctx.background.spawn(async move {
            revalidate(&task_ctx, &task_request).await;
        });
        return Ok(cached);
    }

    match ctx.fetch_within(request, ctx.timeouts.static_asset).await {
        Ok(response) => {
            if response.status.is_success() {
                ctx.store(PartitionRole::Static, request, &response).await;
            }
            Ok(response)
        }
        Err(e) => {
            tracing::debug!("asset fetch failed for {}: {}, retrying without deadline", request.url, e);
            ctx.fetch(request).await
        }
    }
}

/// Background refresh of one cached asset.
async fn revalidate(ctx: &StrategyContext, request: &ResourceRequest) {
    match ctx.fetch(request).await {
        Ok(response) if response.status == StatusCode::OK => {
            if ctx.store(PartitionRole::Static, request, &response).await {
                tracing::debug!("revalidated {}", request.url);
            }
        }
        Ok(response) => {
            tracing::debug!("revalidation of {} returned {}, keeping cached copy", request.url, response.status);
        }
        Err(e) => {
            tracing::debug!("revalidation of {} failed: {}", request.url, e);
        }
    }
}
