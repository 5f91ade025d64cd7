//! Network-first with cache fallback, used for documents.

use reqwest::StatusCode;
use waypoint_core::PartitionRole;

use super::StrategyContext;
use crate::fetch::{CacheMode, Credentials, ResourceRequest, ResourceResponse};

/// Serve a document from the network, falling back to the dynamic partition.
///
/// The live request skips intermediate HTTP caches and only carries
/// credentials to the application's own origin. OK responses are written to
/// the dynamic partition unless the connection is flagged slow; the live
/// response is returned either way. A network failure with nothing cached
/// yields `503 Offline`.
pub async fn network_first(ctx: &StrategyContext, request: &ResourceRequest) -> ResourceResponse {
    let mut live = request.clone();
    live.cache_mode = CacheMode::NoStore;
    live.credentials = Credentials::SameOrigin;

    match ctx.fetch(&live).await {
        Ok(response) => {
            if response.status.is_success() {
                if ctx.connection.is_slow() {
                    tracing::debug!("slow connection, not caching document {}", request.url);
                } else {
                    ctx.store(PartitionRole::Dynamic, request, &response).await;
                }
            }
            response
        }
        Err(e) => {
            tracing::debug!("document fetch failed for {}: {}", request.url, e);
            match ctx.lookup(PartitionRole::Dynamic, request).await {
                Some(cached) => cached,
                None => ResourceResponse::synthesized(StatusCode::SERVICE_UNAVAILABLE, "Offline"),
            }
        }
    }
}
