//! Cache-first with a bounded network attempt, used for fonts.

use reqwest::StatusCode;
use waypoint_core::PartitionRole;

use super::StrategyContext;
use crate::fetch::{ResourceRequest, ResourceResponse};

/// Serve a font from the static partition, fetching it on a miss.
///
/// The first network attempt is bounded by the font timeout; if it fails or
/// times out a single unbounded attempt follows. When both fail the caller
/// still gets a `200` with a plain-text body so the page falls back to a
/// system font instead of seeing an error.
pub async fn cache_first(ctx: &StrategyContext, request: &ResourceRequest) -> ResourceResponse {
    if let Some(cached) = ctx.lookup(PartitionRole::Static, request).await {
        return cached;
    }

    match ctx.fetch_within(request, ctx.timeouts.font).await {
        Ok(response) => {
            if response.status.is_success() {
                ctx.store(PartitionRole::Static, request, &response).await;
            }
            response
        }
        Err(e) => {
            tracing::debug!("font fetch failed for {}: {}, retrying without deadline", request.url, e);
            match ctx.fetch(request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("font unavailable {}: {}", request.url, e);
                    ResourceResponse::synthesized(StatusCode::OK, "Font not available")
                }
            }
        }
    }
}
